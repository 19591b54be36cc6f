use convert_case::{Case, Casing};

/// lower_snake_case form of an identifier.
pub fn snake_case(name: &str) -> String {
    name.to_case(Case::Snake)
}

/// Last `::` segment of a type path.
pub fn short_name(type_path: &str) -> &str {
    type_path.rsplit("::").next().unwrap_or(type_path)
}

/// Whether two identifiers differ only in case style.
pub fn same_identifier(a: &str, b: &str) -> bool {
    a == b || snake_case(a) == snake_case(b)
}
