use std::collections::HashMap;
use std::fmt;

use crate::error::TableError;

/// Ordered, duplicate-free set of numeric attribute names shared by every
/// row of a [`FeatureTable`](crate::FeatureTable).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Schema {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl Schema {
    /// Create a schema from attribute names in column order.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TableError::EmptySchema`] | `names` is empty |
    /// | [`TableError::DuplicateAttribute`] | a name appears more than once |
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Result<Self, TableError> {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(TableError::EmptySchema);
        }
        let mut positions = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if positions.insert(name.clone(), i).is_some() {
                return Err(TableError::DuplicateAttribute { name: name.clone() });
            }
        }
        Ok(Self { names, positions })
    }

    /// Return the attribute names in column order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Return the number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always `false` for a constructed schema; provided for the `len` convention.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Return the column position of `name`, if declared.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Return the column position of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::UnknownAttribute`] if `name` is not declared.
    pub fn require(&self, name: &str) -> Result<usize, TableError> {
        self.position(name).ok_or_else(|| TableError::UnknownAttribute {
            name: name.to_string(),
        })
    }

    /// Map each of this schema's attributes to its column in `source`.
    ///
    /// `result[i]` is the position in `source` of `self.names()[i]`.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::UnknownAttribute`] for the first attribute of
    /// `self` that `source` does not declare.
    pub fn projection_from(&self, source: &Schema) -> Result<Vec<usize>, TableError> {
        self.names.iter().map(|name| source.require(name)).collect()
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.names == other.names
    }
}

impl Eq for Schema {}

impl TryFrom<Vec<String>> for Schema {
    type Error = TableError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(names)
    }
}

impl From<Schema> for Vec<String> {
    fn from(schema: Schema) -> Self {
        schema.names
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::Schema;
    use crate::error::TableError;

    #[test]
    fn positions_follow_declaration_order() {
        let schema = Schema::new(["B2", "B3", "NDVI"]).unwrap();
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.position("B3"), Some(1));
        assert_eq!(schema.position("B8"), None);
    }

    #[test]
    fn empty_schema_rejected() {
        let err = Schema::new(Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, TableError::EmptySchema));
    }

    #[test]
    fn duplicate_attribute_rejected() {
        let err = Schema::new(["B2", "B2"]).unwrap_err();
        assert!(matches!(err, TableError::DuplicateAttribute { name } if name == "B2"));
    }

    #[test]
    fn projection_reorders_columns() {
        let table = Schema::new(["a", "b", "c"]).unwrap();
        let model = Schema::new(["c", "a"]).unwrap();
        assert_eq!(model.projection_from(&table).unwrap(), vec![2, 0]);
    }

    #[test]
    fn projection_reports_missing_attribute() {
        let table = Schema::new(["a", "b"]).unwrap();
        let model = Schema::new(["a", "z"]).unwrap();
        let err = model.projection_from(&table).unwrap_err();
        assert!(matches!(err, TableError::UnknownAttribute { name } if name == "z"));
    }

    #[test]
    fn equality_ignores_lookup_map() {
        let a = Schema::new(["x", "y"]).unwrap();
        let b = Schema::new(vec!["x".to_string(), "y".to_string()]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "x,y");
    }
}
