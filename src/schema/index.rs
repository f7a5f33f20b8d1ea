/// An index of a table.
///
/// An index with an empty name and `primary` set is the table's primary key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Index {
    name: String,
    columns: Vec<String>,
    unique: bool,
    primary: bool,
    rename: Option<String>,
    drop: bool,
}

impl Index {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn column(&mut self, column: impl Into<String>) -> &mut Self {
        self.columns.push(column.into());
        self
    }

    pub fn columns<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn unique(&mut self) -> &mut Self {
        self.unique = true;
        self
    }

    pub fn primary(&mut self) -> &mut Self {
        self.primary = true;
        self
    }

    pub fn rename(&mut self, to: impl Into<String>) -> &mut Self {
        self.rename = Some(to.into());
        self
    }

    pub fn drop(&mut self) -> &mut Self {
        self.drop = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get_columns(&self) -> &[String] {
        &self.columns
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn renamed_to(&self) -> Option<&str> {
        self.rename.as_deref()
    }

    pub fn is_drop(&self) -> bool {
        self.drop
    }

    /// Copy of this index under another name, with rename and drop cleared.
    pub(crate) fn settled_as(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: self.columns.clone(),
            unique: self.unique,
            primary: self.primary,
            rename: None,
            drop: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let mut index = Index::new("name_idx");
        index.column("foo").columns(["bar", "baz"]).unique();

        assert_eq!(index.name(), "name_idx");
        assert_eq!(index.get_columns(), ["foo", "bar", "baz"]);
        assert!(index.is_unique());
        assert!(!index.is_primary());
        assert_eq!(index.renamed_to(), None);
        assert!(!index.is_drop());
    }

    #[test]
    fn test_settled_copy_clears_operations() {
        let mut index = Index::new("a");
        index.column("foo").rename("b").drop();

        let settled = index.settled_as("b");
        assert_eq!(settled.name(), "b");
        assert_eq!(settled.get_columns(), ["foo"]);
        assert_eq!(settled.renamed_to(), None);
        assert!(!settled.is_drop());
    }
}
