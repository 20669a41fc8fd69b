//! Column resolution for rows of the `grupos` table.
//!
//! The table has been exported under several schemas over time. Each logical
//! field has an ordered alias list; the first alias present in the row keys
//! wins. Plate and group fall back to the first and second column.

use serde_json::{Map, Value};

pub const PLATE_ALIASES: &[&str] = &["placa", "placa_veiculo", "plate", "veiculo"];
pub const GROUP_ALIASES: &[&str] = &["grupo", "nome", "name", "group_name"];
pub const CATEGORY_ALIASES: &[&str] = &["categoria", "category"];
pub const MODEL_ALIASES: &[&str] = &["modelo", "model"];

/// Key names of each logical field, fixed for a whole snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    pub plate: Option<String>,
    pub group: Option<String>,
    pub category: Option<String>,
    pub model: Option<String>,
}

impl ColumnMapping {
    /// Resolves the mapping from the keys of the first row, in row order.
    pub fn resolve<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        let keys: Vec<&str> = keys.into_iter().collect();

        let find = |aliases: &[&str]| {
            aliases
                .iter()
                .find(|alias| keys.contains(alias))
                .map(|alias| alias.to_string())
        };
        let positional = |i: usize| keys.get(i).map(|k| k.to_string());

        let plate = find(PLATE_ALIASES).or_else(|| positional(0));
        let group = find(GROUP_ALIASES)
            .or_else(|| positional(1))
            .filter(|g| Some(g) != plate.as_ref());

        ColumnMapping {
            plate,
            group,
            category: find(CATEGORY_ALIASES),
            model: find(MODEL_ALIASES),
        }
    }

    pub fn plate_of(&self, row: &Map<String, Value>) -> Option<String> {
        field_text(row, self.plate.as_deref())
    }

    pub fn group_of(&self, row: &Map<String, Value>) -> Option<String> {
        field_text(row, self.group.as_deref())
    }

    pub fn category_of(&self, row: &Map<String, Value>) -> Option<String> {
        field_text(row, self.category.as_deref())
    }

    pub fn model_of(&self, row: &Map<String, Value>) -> Option<String> {
        field_text(row, self.model.as_deref())
    }
}

/// Reads a field as trimmed, non-empty text. Numbers and booleans are
/// rendered; nulls, arrays and objects count as absent.
fn field_text(row: &Map<String, Value>, key: Option<&str>) -> Option<String> {
    let text = match row.get(key?)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_named_fields_preferred() {
        let mapping = ColumnMapping::resolve(["id", "modelo", "grupo", "placa", "categoria"]);
        assert_eq!(mapping.plate.as_deref(), Some("placa"));
        assert_eq!(mapping.group.as_deref(), Some("grupo"));
        assert_eq!(mapping.category.as_deref(), Some("categoria"));
        assert_eq!(mapping.model.as_deref(), Some("modelo"));
    }

    #[test]
    fn test_alias_order() {
        let mapping = ColumnMapping::resolve(["plate", "veiculo", "group_name", "name"]);
        assert_eq!(mapping.plate.as_deref(), Some("plate"));
        assert_eq!(mapping.group.as_deref(), Some("name"));
    }

    #[test]
    fn test_positional_fallback() {
        let mapping = ColumnMapping::resolve(["col_a", "col_b", "col_c"]);
        assert_eq!(mapping.plate.as_deref(), Some("col_a"));
        assert_eq!(mapping.group.as_deref(), Some("col_b"));
        assert_eq!(mapping.category, None);
        assert_eq!(mapping.model, None);
    }

    #[test]
    fn test_single_column_has_no_group() {
        let mapping = ColumnMapping::resolve(["placa"]);
        assert_eq!(mapping.plate.as_deref(), Some("placa"));
        assert_eq!(mapping.group, None);
    }

    #[test]
    fn test_field_text_values() {
        let mapping = ColumnMapping::resolve(["placa", "grupo", "categoria"]);
        let row = object(json!({"placa": 1234, "grupo": "  Frota A ", "categoria": null}));

        assert_eq!(mapping.plate_of(&row).as_deref(), Some("1234"));
        assert_eq!(mapping.group_of(&row).as_deref(), Some("Frota A"));
        assert_eq!(mapping.category_of(&row), None);
        assert_eq!(mapping.model_of(&row), None);
    }

    #[test]
    fn test_blank_text_is_absent() {
        let mapping = ColumnMapping::resolve(["placa", "grupo"]);
        let row = object(json!({"placa": "ABC1D23", "grupo": "   "}));
        assert_eq!(mapping.group_of(&row), None);
    }
}
