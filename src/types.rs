#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// What to do with the first entry the staging directory enumerates.
///
/// `SkipFirst` reproduces the legacy script, whose scan loop started at
/// index 1 and silently dropped whatever the filesystem listed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeadingEntryPolicy {
    #[default]
    Keep,
    SkipFirst,
}

impl LeadingEntryPolicy {
    pub fn from_flag(skip_first_entry: bool) -> Self {
        if skip_first_entry {
            LeadingEntryPolicy::SkipFirst
        } else {
            LeadingEntryPolicy::Keep
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_from_flag() {
        assert_eq!(LeadingEntryPolicy::from_flag(false), LeadingEntryPolicy::Keep);
        assert_eq!(
            LeadingEntryPolicy::from_flag(true),
            LeadingEntryPolicy::SkipFirst
        );
        assert_eq!(LeadingEntryPolicy::default(), LeadingEntryPolicy::Keep);
    }

    #[test]
    fn test_log_level_filter() {
        assert_eq!(LogLevel::Warn.as_filter(), "warn");
        assert_eq!(LogLevel::Debug.as_filter(), "debug");
    }
}
