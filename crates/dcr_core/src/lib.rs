pub mod config;
pub mod error;
pub mod report;

#[cfg(test)]
mod tests {
    use super::error::AppError;

    #[test]
    fn app_error_is_structured() {
        let err = AppError::new("CHAT_FAILED", "chat call failed").with_retryable(true);
        assert_eq!(err.code, "CHAT_FAILED");
        assert_eq!(err.message, "chat call failed");
        assert!(err.retryable);
    }

    #[test]
    fn config_missing_carries_setting_name() {
        let err = AppError::config_missing("DCR_TRANSCRIBE_ENDPOINT");
        assert!(err.is_config_missing());
        assert_eq!(err.details.as_deref(), Some("setting=DCR_TRANSCRIBE_ENDPOINT"));
    }
}
