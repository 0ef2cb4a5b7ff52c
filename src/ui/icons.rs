pub struct Icons;

impl Icons {
    pub const ROCKET: &str = "🚀";
    pub const SEARCH: &str = "🔍";
    pub const CHECK: &str = "✅";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
    pub const STATS: &str = "📊";
    pub const MAIL: &str = "📬";
    pub const QUOTE: &str = "💬";
    pub const BOOK: &str = "📖";
    pub const PERSON: &str = "👤";
    pub const TOPIC: &str = "🏷️";
    pub const LANGUAGE: &str = "🌐";
}
