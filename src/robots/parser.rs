//! Robots.txt policy parsing
//!
//! Allow/disallow matching is delegated to the robotstxt crate; Crawl-delay
//! is parsed here because the crate does not surface it.

use robotstxt::DefaultMatcher;

/// A parsed robots.txt policy for one origin
#[derive(Debug, Clone)]
pub struct RobotsPolicy {
    /// Raw robots.txt content
    content: String,

    /// Crawl-delay groups: (user agents in the group, delay seconds)
    delays: Vec<(Vec<String>, f64)>,

    /// Permissive policy (missing or unreadable robots.txt)
    permissive: bool,
}

impl RobotsPolicy {
    /// Parses raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            delays: parse_crawl_delays(content),
            content: content.to_string(),
            permissive: false,
        }
    }

    /// Creates a policy that allows everything
    ///
    /// Used when robots.txt is missing, unreachable, or returns an error.
    pub fn permissive() -> Self {
        Self {
            content: String::new(),
            delays: Vec::new(),
            permissive: true,
        }
    }

    /// Checks whether a URL is allowed for the given user agent
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.permissive || self.content.is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }

    /// Returns the crawl delay in seconds for the given user agent
    ///
    /// A group naming the agent specifically wins over a wildcard group.
    /// Returns 0.0 when no delay applies.
    pub fn crawl_delay(&self, user_agent: &str) -> f64 {
        let normalized = user_agent.to_lowercase();
        let mut wildcard = None;
        let mut specific = None;

        for (agents, delay) in &self.delays {
            let is_wildcard = agents.iter().any(|a| a == "*");
            let is_specific = agents
                .iter()
                .any(|a| a != "*" && normalized.contains(a.as_str()));
            if is_specific {
                specific = Some(*delay);
            } else if is_wildcard {
                wildcard = Some(*delay);
            }
        }

        specific.or(wildcard).unwrap_or(0.0)
    }
}

/// Extracts (user-agent group, crawl-delay) pairs from robots.txt content
///
/// Consecutive User-agent lines form one group; a Crawl-delay line closes
/// the group it belongs to.
fn parse_crawl_delays(content: &str) -> Vec<(Vec<String>, f64)> {
    let mut groups = Vec::new();
    let mut current_agents: Vec<String> = Vec::new();
    let mut group_open = false;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let Some((key, value)) = trimmed.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();

        match key.as_str() {
            "user-agent" => {
                // A User-agent line after other directives starts a new group
                if !group_open {
                    current_agents.clear();
                    group_open = true;
                }
                current_agents.push(value.to_lowercase());
            }
            "crawl-delay" => {
                group_open = false;
                if let Ok(delay) = value.parse::<f64>() {
                    if !current_agents.is_empty() && delay >= 0.0 {
                        groups.push((current_agents.clone(), delay));
                    }
                }
            }
            _ => {
                group_open = false;
            }
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permissive_allows_everything() {
        let policy = RobotsPolicy::permissive();
        assert!(policy.is_allowed("/any/path", "TestBot"));
        assert!(policy.is_allowed("/admin", "TestBot"));
        assert_eq!(policy.crawl_delay("TestBot"), 0.0);
    }

    #[test]
    fn test_disallow_all() {
        let policy = RobotsPolicy::from_content("User-agent: *\nDisallow: /");
        assert!(!policy.is_allowed("/", "TestBot"));
        assert!(!policy.is_allowed("/kontakt", "TestBot"));
    }

    #[test]
    fn test_disallow_specific_path() {
        let policy = RobotsPolicy::from_content("User-agent: *\nDisallow: /admin");
        assert!(policy.is_allowed("/", "TestBot"));
        assert!(policy.is_allowed("/kontakt", "TestBot"));
        assert!(!policy.is_allowed("/admin", "TestBot"));
        assert!(!policy.is_allowed("/admin/users", "TestBot"));
    }

    #[test]
    fn test_agent_specific_disallow() {
        let content = "User-agent: BadBot\nDisallow: /\n\nUser-agent: *\nAllow: /";
        let policy = RobotsPolicy::from_content(content);
        assert!(policy.is_allowed("/page", "GoodBot"));
        assert!(!policy.is_allowed("/page", "BadBot"));
    }

    #[test]
    fn test_empty_content_allows() {
        let policy = RobotsPolicy::from_content("");
        assert!(policy.is_allowed("/any", "TestBot"));
    }

    #[test]
    fn test_crawl_delay_wildcard() {
        let policy = RobotsPolicy::from_content("User-agent: *\nCrawl-delay: 10");
        assert_eq!(policy.crawl_delay("TestBot"), 10.0);
        assert_eq!(policy.crawl_delay("AnyBot"), 10.0);
    }

    #[test]
    fn test_crawl_delay_specific_beats_wildcard() {
        let content = "User-agent: testbot\nCrawl-delay: 5\n\nUser-agent: *\nCrawl-delay: 10";
        let policy = RobotsPolicy::from_content(content);
        assert_eq!(policy.crawl_delay("TestBot"), 5.0);
        assert_eq!(policy.crawl_delay("OtherBot"), 10.0);
    }

    #[test]
    fn test_crawl_delay_absent() {
        let policy = RobotsPolicy::from_content("User-agent: *\nDisallow: /admin");
        assert_eq!(policy.crawl_delay("TestBot"), 0.0);
    }

    #[test]
    fn test_crawl_delay_decimal() {
        let policy = RobotsPolicy::from_content("User-agent: *\nCrawl-delay: 2.5");
        assert_eq!(policy.crawl_delay("TestBot"), 2.5);
    }

    #[test]
    fn test_crawl_delay_shared_group() {
        let policy =
            RobotsPolicy::from_content("User-agent: bota\nUser-agent: botb\nCrawl-delay: 3");
        assert_eq!(policy.crawl_delay("BotA"), 3.0);
        assert_eq!(policy.crawl_delay("BotB"), 3.0);
        assert_eq!(policy.crawl_delay("BotC"), 0.0);
    }

    #[test]
    fn test_crawl_delay_after_disallow_same_group() {
        let content = "User-agent: *\nDisallow: /admin\nCrawl-delay: 4";
        let policy = RobotsPolicy::from_content(content);
        assert_eq!(policy.crawl_delay("TestBot"), 4.0);
    }

    #[test]
    fn test_negative_crawl_delay_ignored() {
        let policy = RobotsPolicy::from_content("User-agent: *\nCrawl-delay: -1");
        assert_eq!(policy.crawl_delay("TestBot"), 0.0);
    }

    #[test]
    fn test_garbage_content_is_permissive() {
        let policy = RobotsPolicy::from_content("this is not robots.txt {{{");
        assert!(policy.is_allowed("/any", "TestBot"));
    }
}
