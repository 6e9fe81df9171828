//! 配置系统
//! 从环境变量加载所有配置，使用 Secret 包装敏感信息

use config::{Config, ConfigError, Environment};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

/// 令牌有效期上限（约 10 年）
pub const MAX_TOKEN_TTL_SECS: u64 = 10 * 365 * 24 * 3600;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址，例如 "0.0.0.0:8081"
    pub addr: String,
    /// 优雅关闭超时时间（秒）
    pub graceful_shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 数据库连接 URL（使用 Secret 包装，防止日志泄露）
    pub url: Secret<String>,
    /// 最大连接数
    pub max_connections: u32,
    /// 最小连接数
    pub min_connections: u32,
    /// 获取连接超时时间（秒）
    pub acquire_timeout_secs: u64,
    /// 空闲连接超时时间（秒）
    pub idle_timeout_secs: u64,
    /// 连接最大生命周期（秒）
    pub max_lifetime_secs: u64,
    /// 使用进程内存储代替 PostgreSQL（开发/测试）
    #[serde(default)]
    pub in_memory: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别: trace, debug, info, warn, error
    pub level: String,
    /// 日志格式: json, pretty
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// 会话令牌签名密钥（本地模式，使用 Secret 包装）
    pub jwt_secret: Secret<String>,
    /// 访问令牌过期时间（秒）
    pub access_token_exp_secs: u64,
    /// 刷新令牌过期时间（秒）
    pub refresh_token_exp_secs: u64,
    /// Argon2 内存开销（KiB）
    pub argon2_memory_kib: u32,
    /// Argon2 迭代次数
    pub argon2_iterations: u32,
    /// Argon2 并行度
    pub argon2_parallelism: u32,
    /// 明文密码最大字节数
    pub max_password_bytes: usize,
    /// 熵阈值：假定的最小密码长度
    pub min_password_length: u32,
    /// 熵阈值：假定的字符集大小
    pub password_alphabet_size: u32,
    /// 登录时是否轮换已撤销/过期的刷新令牌
    #[serde(default)]
    pub rotate_unusable_refresh_on_login: bool,
}

/// 信任模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustMode {
    /// 校验本服务签发的 HS256 会话令牌
    Local,
    /// 校验外部身份提供方签发的令牌（JWKS）
    External,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub mode: TrustMode,
    /// 身份提供方基础 URL（外部模式）
    #[serde(default)]
    pub provider_url: Option<String>,
    /// 身份提供方 API Key（外部模式）
    #[serde(default)]
    pub provider_api_key: Option<Secret<String>>,
    /// 允许的签名算法
    pub allowed_algorithms: Vec<String>,
    /// 签发时间允许的时钟偏差（秒）
    pub clock_skew_secs: u64,
    /// JWKS / token 请求超时（秒）
    pub jwks_timeout_secs: u64,
    /// JWKS 缓存有效期（秒）
    pub jwks_cache_ttl_secs: u64,
    /// 两次按需刷新 JWKS 的最小间隔（秒）
    pub jwks_min_refresh_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Config::builder();

        // 添加默认配置
        settings = settings
            .set_default("server.addr", "localhost:8081")?
            .set_default("server.graceful_shutdown_timeout_secs", 10)?
            .set_default("database.url", "")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("database.idle_timeout_secs", 600)?
            .set_default("database.max_lifetime_secs", 1800)?
            .set_default("database.in_memory", false)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?
            .set_default("security.jwt_secret", "")?
            .set_default("security.access_token_exp_secs", 3600)?
            .set_default("security.refresh_token_exp_secs", 60 * 24 * 3600)?
            .set_default("security.argon2_memory_kib", 65536)?
            .set_default("security.argon2_iterations", 3)?
            .set_default("security.argon2_parallelism", 4)?
            .set_default("security.max_password_bytes", 72)?
            .set_default("security.min_password_length", 12)?
            .set_default("security.password_alphabet_size", 89)?
            .set_default("security.rotate_unusable_refresh_on_login", false)?
            .set_default("auth.mode", "local")?
            .set_default("auth.allowed_algorithms", vec!["ES256"])?
            .set_default("auth.clock_skew_secs", 60)?
            .set_default("auth.jwks_timeout_secs", 10)?
            .set_default("auth.jwks_cache_ttl_secs", 3600)?
            .set_default("auth.jwks_min_refresh_secs", 30)?;

        // 从环境变量加载配置（前缀为 UNSUBTLE_）
        settings = settings.add_source(
            Environment::with_prefix("UNSUBTLE")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("auth.allowed_algorithms")
                .try_parsing(true),
        );

        let config: AppConfig = settings.build()?.try_deserialize()?;

        // 验证配置
        config.validate()?;

        Ok(config)
    }

    /// 验证配置合法性
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 验证日志级别
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                )))
            }
        }

        // 验证日志格式
        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log format: {}. Must be one of: json, pretty",
                    self.logging.format
                )))
            }
        }

        // 验证数据库连接池配置
        if self.database.max_connections < self.database.min_connections {
            return Err(ConfigError::Message(
                "max_connections must be >= min_connections".to_string(),
            ));
        }

        if !self.database.in_memory && self.database.url.expose_secret().is_empty() {
            return Err(ConfigError::Message(
                "database.url must be set unless database.in_memory is enabled".to_string(),
            ));
        }

        // 验证令牌过期时间
        if self.security.access_token_exp_secs == 0 {
            return Err(ConfigError::Message(
                "access_token_exp_secs must be greater than zero".to_string(),
            ));
        }

        if self.security.refresh_token_exp_secs == 0 {
            return Err(ConfigError::Message(
                "refresh_token_exp_secs must be greater than zero".to_string(),
            ));
        }

        if self.security.access_token_exp_secs > MAX_TOKEN_TTL_SECS
            || self.security.refresh_token_exp_secs > MAX_TOKEN_TTL_SECS
        {
            return Err(ConfigError::Message(format!(
                "token lifetimes must not exceed {} seconds",
                MAX_TOKEN_TTL_SECS
            )));
        }

        if self.security.max_password_bytes == 0 {
            return Err(ConfigError::Message(
                "max_password_bytes must be greater than zero".to_string(),
            ));
        }

        match self.auth.mode {
            TrustMode::Local => {
                // 验证 JWT 密钥长度（至少 32 字符）
                if self.security.jwt_secret.expose_secret().len() < 32 {
                    return Err(ConfigError::Message(
                        "JWT secret must be at least 32 characters long".to_string(),
                    ));
                }
            }
            TrustMode::External => {
                if self.auth.provider_url.as_deref().map_or(true, str::is_empty) {
                    return Err(ConfigError::Message(
                        "auth.provider_url is required in external mode".to_string(),
                    ));
                }
                if self
                    .auth
                    .provider_api_key
                    .as_ref()
                    .map_or(true, |key| key.expose_secret().is_empty())
                {
                    return Err(ConfigError::Message(
                        "auth.provider_api_key is required in external mode".to_string(),
                    ));
                }
                if self.auth.allowed_algorithms.is_empty() {
                    return Err(ConfigError::Message(
                        "auth.allowed_algorithms must not be empty".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}
