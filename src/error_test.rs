use super::*;

#[test]
fn config_error_names_key_and_value() {
    let err = ConfigError::InvalidNumber { key: "duration".into(), value: "soon".into() };
    assert_eq!(err.to_string(), "`duration` expects a number, got \"soon\"");
}

#[test]
fn storage_error_display() {
    assert_eq!(StorageError::Unavailable.to_string(), "storage unavailable");
    let err = StorageError::Write { key: "drawer:nav".into(), reason: "quota".into() };
    assert_eq!(err.to_string(), "failed to write `drawer:nav`: quota");
}

#[test]
fn binding_error_display() {
    let err = BindingError::UnknownController("carousel".into());
    assert_eq!(err.to_string(), "no controller registered as `carousel`");
}
