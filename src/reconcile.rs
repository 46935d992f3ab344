//! Null-versus-empty reconciliation for optional fields.
//!
//! Optional list fields are tri-state: unset (`None`), explicitly empty
//! (`Some(vec![])`) or populated. The API does not preserve the difference
//! between unset and empty, so the state written after each call is derived
//! from what the server returned *and* what the user previously wrote:
//!
//! | call            | remote populated | remote empty or absent          |
//! |-----------------|------------------|---------------------------------|
//! | create          | remote           | config (`None` stays `None`)    |
//! | read / update   | remote           | `None` if prior was `None`, else `[]` |
//! | data source     | remote           | `None`                          |
//!
//! On create, an unset config value stays unset even if the server fills one in.
//! Optional strings follow the same rules with `""` standing in for `[]`.

/// List value to store after a create.
pub fn list_on_create(
    config: Option<Vec<String>>,
    remote: Option<Vec<String>>,
) -> Option<Vec<String>> {
    match config {
        None => None,
        Some(config) => Some(remote.unwrap_or(config)),
    }
}

/// List value to store after a read or update, given the prior stored value.
pub fn list_on_refresh(
    prior: Option<&Vec<String>>,
    remote: Option<Vec<String>>,
) -> Option<Vec<String>> {
    match remote {
        Some(items) if !items.is_empty() => Some(items),
        _ => prior.map(|_| Vec::new()),
    }
}

/// List value exposed by a data source. Empty collapses to unset.
pub fn list_for_data_source(remote: Option<Vec<String>>) -> Option<Vec<String>> {
    remote.filter(|items| !items.is_empty())
}

/// String value to store after a read or update, given the prior stored value.
pub fn string_on_refresh(prior: Option<&String>, remote: Option<String>) -> Option<String> {
    match remote {
        Some(s) if !s.is_empty() => Some(s),
        _ => prior.map(|_| String::new()),
    }
}

/// String value exposed by a data source. Empty collapses to unset.
pub fn string_for_data_source(remote: Option<String>) -> Option<String> {
    remote.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Option<Vec<String>> {
        Some(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_create_keeps_unset_unset() {
        assert_eq!(list_on_create(None, None), None);
        assert_eq!(list_on_create(None, list(&["-v"])), None);
    }

    #[test]
    fn test_create_with_config() {
        assert_eq!(list_on_create(list(&[]), None), list(&[]));
        assert_eq!(list_on_create(list(&["-v"]), None), list(&["-v"]));
        assert_eq!(list_on_create(list(&["-v"]), list(&["-v", "-q"])), list(&["-v", "-q"]));
        assert_eq!(list_on_create(list(&[]), list(&[])), list(&[]));
    }

    #[test]
    fn test_refresh() {
        let prior_unset: Option<Vec<String>> = None;
        let prior_empty = list(&[]);
        let prior_full = list(&["a"]);

        assert_eq!(list_on_refresh(prior_unset.as_ref(), None), None);
        assert_eq!(list_on_refresh(prior_unset.as_ref(), list(&[])), None);
        assert_eq!(list_on_refresh(prior_unset.as_ref(), list(&["b"])), list(&["b"]));

        assert_eq!(list_on_refresh(prior_empty.as_ref(), None), list(&[]));
        assert_eq!(list_on_refresh(prior_empty.as_ref(), list(&[])), list(&[]));

        // Drift to empty upstream surfaces as an explicit empty list.
        assert_eq!(list_on_refresh(prior_full.as_ref(), list(&[])), list(&[]));
        assert_eq!(list_on_refresh(prior_full.as_ref(), list(&["a"])), list(&["a"]));
    }

    #[test]
    fn test_data_source() {
        assert_eq!(list_for_data_source(None), None);
        assert_eq!(list_for_data_source(list(&[])), None);
        assert_eq!(list_for_data_source(list(&["windows"])), list(&["windows"]));

        assert_eq!(string_for_data_source(Some(String::new())), None);
        assert_eq!(string_for_data_source(Some("Maint".into())), Some("Maint".into()));
    }

    #[test]
    fn test_string_refresh() {
        let unset: Option<String> = None;
        let set = Some("Maintenance".to_string());

        assert_eq!(string_on_refresh(unset.as_ref(), Some(String::new())), None);
        assert_eq!(string_on_refresh(unset.as_ref(), None), None);
        assert_eq!(string_on_refresh(set.as_ref(), None), Some(String::new()));
        assert_eq!(
            string_on_refresh(set.as_ref(), Some("Cleanup".into())),
            Some("Cleanup".into())
        );
    }
}
