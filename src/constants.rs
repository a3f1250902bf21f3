/// Constants module to avoid magic numbers in the codebase

// Provider endpoints
pub const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const ANTHROPIC_API_VERSION: &str = "2023-06-01";
pub const GOOGLE_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

// Default models
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-sonnet-20240229";
pub const DEFAULT_GOOGLE_MODEL: &str = "gemini-pro";

// Provider priorities (highest is tried first)
pub const OPENAI_PRIORITY: i32 = 30;
pub const ANTHROPIC_PRIORITY: i32 = 20;
pub const GOOGLE_PRIORITY: i32 = 10;

// Timeouts
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const SYNTAX_CHECK_TIMEOUT_SECS: u64 = 10;

// Default Model Configuration
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: usize = 4000;

// Analysis limits
pub const MAX_FILE_SIZE: u64 = 1024 * 1024; // 1MB
pub const MAX_CODE_SIZE: usize = 1024 * 1024;
pub const DEFAULT_MAX_FILES: usize = 100;
pub const LARGE_INPUT_THRESHOLD: usize = 100_000;
pub const SLOW_ANALYSIS_THRESHOLD_SECS: f64 = 10.0;

// Cache
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
pub const DEFAULT_SEMANTIC_THRESHOLD: f64 = 0.85;
pub const SIGNATURE_MAX_VARIABLES: usize = 20;
// Entries compared per similarity lookup
pub const SIMILARITY_SCAN_LIMIT: usize = 200;

// Rate limiting
pub const REQUESTS_PER_MINUTE: u32 = 60;
pub const FILE_REQUESTS_PER_MINUTE: u32 = 30;
pub const REQUESTS_PER_HOUR: u32 = 1000;

// Analyzer names, in default execution order
pub const ANALYZER_NAMES: &[&str] = &["security", "performance", "quality", "documentation"];

// Paths skipped during directory analysis
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    "vendor/",
    "var/cache/",
    "var/log/",
    "node_modules/",
    "public/build/",
];

pub const DEFAULT_SUPPORTED_EXTENSIONS: &[&str] = &["php"];

pub const DEFAULT_LINTER_COMMAND: &[&str] = &["php", "-l"];

// Values that look like API keys but are not
pub const API_KEY_PLACEHOLDERS: &[&str] = &[
    "your_openai_api_key_here",
    "your_anthropic_api_key_here",
    "your_google_api_key_here",
    "sk-placeholder",
    "placeholder",
    "change_me",
    "null",
    "false",
];
