use crate::config::types::{
    ClassifierConfig, Config, CrawlerConfig, ExtractionConfig, OutputConfig, RenderConfig,
    UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_extraction_config(&config.extraction)?;
    validate_classifier_config(&config.classifier)?;
    validate_render_config(&config.render)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.worker_pool_size < 1 || config.worker_pool_size > 64 {
        return Err(ConfigError::Validation(format!(
            "worker_pool_size must be between 1 and 64, got {}",
            config.worker_pool_size
        )));
    }

    if config.max_pages_per_seed < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages_per_seed must be >= 1, got {}",
            config.max_pages_per_seed
        )));
    }

    for (name, value) in [
        ("connect_timeout_ms", config.connect_timeout_ms),
        ("read_timeout_ms", config.read_timeout_ms),
        ("robots_timeout_ms", config.robots_timeout_ms),
    ] {
        if value == 0 {
            return Err(ConfigError::Validation(format!("{} must be > 0", name)));
        }
    }

    if config.retry_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "retry_attempts must be <= 10, got {}",
            config.retry_attempts
        )));
    }

    if config.queue_ceiling_factor < 1 {
        return Err(ConfigError::Validation(
            "queue_ceiling_factor must be >= 1".to_string(),
        ));
    }

    if config.max_consecutive_failures < 1 {
        return Err(ConfigError::Validation(
            "max_consecutive_failures must be >= 1".to_string(),
        ));
    }

    for label in &config.fallback_encodings {
        if encoding_rs::Encoding::for_label(label.as_bytes()).is_none() {
            return Err(ConfigError::Validation(format!(
                "Unknown fallback encoding '{}'",
                label
            )));
        }
    }

    for pattern in &config.probe_patterns {
        if pattern.is_empty() || !pattern.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(ConfigError::Validation(format!(
                "probe pattern '{}' must be a non-empty DNS label",
                pattern
            )));
        }
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters, '-' and '_', got '{}'",
            config.crawler_name
        )));
    }

    if let Some(contact_url) = &config.contact_url {
        Url::parse(contact_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;
    }

    if let Some(email) = &config.contact_email {
        validate_email(email)?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates extraction configuration
fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    let suffix = config.suffix();
    if suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ConfigError::Validation(format!(
            "domain_suffix must be a top-level label such as 'dz', got '{}'",
            config.domain_suffix
        )));
    }

    if config.max_context_length == 0 {
        return Err(ConfigError::Validation(
            "max_context_length must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates classifier thresholds
fn validate_classifier_config(config: &ClassifierConfig) -> Result<(), ConfigError> {
    if config.abbreviation_short_length > config.abbreviation_max_length {
        return Err(ConfigError::Validation(format!(
            "abbreviation_short_length ({}) cannot exceed abbreviation_max_length ({})",
            config.abbreviation_short_length, config.abbreviation_max_length
        )));
    }

    if config.denylist.iter().any(|entry| entry.is_empty()) {
        return Err(ConfigError::Validation(
            "classifier denylist cannot contain empty entries".to_string(),
        ));
    }

    Ok(())
}

/// Validates render configuration
fn validate_render_config(config: &RenderConfig) -> Result<(), ConfigError> {
    if config.enabled && config.navigation_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "navigation_timeout_ms must be > 0 when rendering is enabled".to_string(),
        ));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
