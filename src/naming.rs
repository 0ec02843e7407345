use crate::record::Record;

/// Conventional suffix stripped from type names before pluralizing,
/// so `MemberRecord` and `Member` both map to `members`.
pub const RECORD_SUFFIX: &str = "Record";

/// Table identifier for `R`: the explicit override if declared, otherwise
/// the derived plural of its type name.
pub fn table_name<R: Record>() -> String {
    match R::TABLE_NAME {
        Some(name) => name.to_string(),
        None => derive_table_name(R::type_name()),
    }
}

/// Lower-cases the type name without its `Record` suffix and appends `s`.
/// Irregular plurals are not handled.
pub fn derive_table_name(type_name: &str) -> String {
    let base = type_name
        .strip_suffix(RECORD_SUFFIX)
        .filter(|base| !base.is_empty())
        .unwrap_or(type_name);
    format!("{}s", base.to_lowercase())
}

/// Last path segment of a fully qualified type name, without generics.
pub fn simple_type_name(full: &str) -> &str {
    let path = full.split('<').next().unwrap_or(full);
    path.rsplit("::").next().unwrap_or(path)
}

/// Double-quotes an identifier, doubling embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_plural_lowercase_names() {
        assert_eq!(derive_table_name("Member"), "members");
        assert_eq!(derive_table_name("GuildRecord"), "guilds");
        assert_eq!(derive_table_name("Record"), "records");
        assert_eq!(derive_table_name("Box"), "boxs");
    }

    #[test]
    fn strips_paths_and_generics() {
        assert_eq!(simple_type_name("app::model::Member"), "Member");
        assert_eq!(simple_type_name("app::Wrapper<app::Member>"), "Wrapper");
        assert_eq!(simple_type_name("Member"), "Member");
    }

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_ident("members"), "\"members\"");
        assert_eq!(quote_ident("odd\"name"), "\"odd\"\"name\"");
    }
}
