use std::fmt;

use itertools::Itertools;

/// Field type of a column.
///
/// `Char(n)` is a fixed-max-length string: on disk it takes a 4-byte
/// length prefix plus `n` payload bytes, shorter values zero-padded.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Type {
    Int32,
    Char(u8),
}

impl Type {
    /// Size of the type on disk, in bytes.
    pub fn size(&self) -> usize {
        match self {
            Type::Int32 => 4,
            Type::Char(max) => 4 + *max as usize,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldItem {
    pub field_name: String,
    pub field_type: Type,
}

impl FieldItem {
    pub fn new(field_name: &str, field_type: Type) -> FieldItem {
        FieldItem {
            field_name: field_name.to_string(),
            field_type,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Schema {
    pub fields: Vec<FieldItem>,
}

impl Schema {
    pub fn new(fields: Vec<FieldItem>) -> Schema {
        Schema { fields }
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn get_field_type(&self, i: usize) -> Type {
        self.fields[i].field_type
    }

    pub fn get_field_name(&self, i: usize) -> &str {
        &self.fields[i].field_name
    }

    /// Tuple size on disk, in bytes.
    pub fn get_size(&self) -> usize {
        self.fields.iter().map(|f| f.field_type.size()).sum()
    }
}

// Field names are advisory, two schemas are equal iff their type
// sequences are equal.
impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(&other.fields)
                .all(|(a, b)| a.field_type == b.field_type)
    }
}

impl Eq for Schema {}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let content = self
            .fields
            .iter()
            .map(|field| format!("{}: {:?}", field.field_name, field.field_type))
            .join(", ");
        write!(f, "({})", content)
    }
}

pub fn small_int_schema(width: usize, name_prefix: &str) -> Schema {
    let mut fields: Vec<FieldItem> = Vec::new();
    for i in 0..width {
        let field = FieldItem::new(&format!("{}-{}", name_prefix, i), Type::Int32);
        fields.push(field);
    }

    Schema { fields }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_equality_ignores_names() {
        let a = small_int_schema(2, "a");
        let b = small_int_schema(2, "b");
        assert_eq!(a, b);

        let c = small_int_schema(3, "a");
        assert_ne!(a, c);

        let d = Schema::new(vec![
            FieldItem::new("x", Type::Int32),
            FieldItem::new("y", Type::Char(16)),
        ]);
        assert_ne!(a, d);
    }

    #[test]
    fn test_type_size() {
        assert_eq!(Type::Int32.size(), 4);
        assert_eq!(Type::Char(16).size(), 20);

        let schema = Schema::new(vec![
            FieldItem::new("id", Type::Int32),
            FieldItem::new("name", Type::Char(16)),
        ]);
        assert_eq!(schema.get_size(), 24);
    }
}
