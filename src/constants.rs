pub const MODEL_API_KEY_ENV_NAME: &str = "ANTHROPIC_API_KEY";
pub const BOT_TOKEN_ENV_NAME: &str = "TELEGRAM_BOT_TOKEN";
pub const CHAT_ID_ENV_NAME: &str = "TELEGRAM_CHAT_ID";

pub const DEFAULT_MODEL_API_BASE: &str = "https://api.anthropic.com";
pub const DEFAULT_BOT_API_BASE: &str = "https://api.telegram.org";
pub(crate) const MODEL_API_VERSION: &str = "2023-06-01";

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-6";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub(crate) const WEB_SEARCH_TOOL_TYPE: &str = "web_search_20250305";
pub(crate) const WEB_SEARCH_TOOL_NAME: &str = "web_search";

/// Maximum number of characters sent in a single chat message.
pub const CHUNK_SIZE: usize = 4000;
pub(crate) const RICH_TEXT_PARSE_MODE: &str = "Markdown";

pub const GENERATION_ATTEMPTS: u32 = 3;
pub const RATE_LIMIT_PAUSE_SECS: u64 = 60;

pub const NO_TEXT_SENTINEL: &str = "Error: no text returned";
pub const RATE_LIMITED_SENTINEL: &str = "Error: rate limited, brief not generated";

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M HKT";
pub(crate) const TIMESTAMP_UTC_OFFSET_SECS: i32 = 8 * 3600;
pub const DEFAULT_TIMESTAMP_MARKER: &str = "Timestamp:";

pub(crate) const DEFAULT_TRIGGER: &str = "Output. Timestamp: {timestamp}";

pub(crate) const DEFAULT_INSTRUCTIONS: &str = r#"
You are a senior equity research analyst compiling a pre-market intelligence brief
for a fundamental equities PM focused on US tech (Mag 7), China/HK consumer and internet,
AI infrastructure and cross-market themes.

Time: it is 8:30am HKT. Cover the last 12-16 hours of market activity.

Structure the brief as:
1. Overnight US session recap (index closes, VIX, sector moves, after-hours earnings)
2. Magnificent 7 tracker (compact table, material news only)
3. China / HK equities (Hang Seng, HSI Tech, CSI 300, HKEX filings, policy signals)
4. US-China cross-market (export controls, tariffs, geopolitics, trade data)
5. AI infrastructure and China AI consumer competition
6. Commodities (only moves above 1% or structural stories)
7. Macro (Treasury yields, DXY, USD/CNH, USD/JPY, central banks)
8. Catalysts today (table: Time (HKT) | Event | Why it matters)"#;

pub(crate) const DEFAULT_FORMAT_RULES: &[&str] = &[
    "Lead with the single most important story in bold, one sentence",
    "Use tables for multi-name comparisons",
    "Specific numbers always: prices, %, bps, $B",
    "Causal chains where non-obvious: A -> B -> C",
    "If a story has competing narratives, state both",
    "Skip anything immaterial. Silence = nothing happened",
    "End with: \"Key risk today:\" and one sentence",
    "Exclude any story you cannot attribute to a named source",
];

pub(crate) const DEFAULT_SOURCES: &[&str] = &[
    "https://www.bloomberg.com",
    "https://www.reuters.com",
    "https://www.cnbc.com/markets",
    "https://www.hkexnews.hk",
    "https://www.globenewswire.com",
    "https://www.prnewswire.com",
    "https://www.sec.gov/cgi-bin/browse-edgar",
    "https://technode.com",
    "https://www.scmp.com/business",
    "https://www.mining.com",
];
