//! Robots.txt parser implementation
//!
//! Parsing is permissive: lines that cannot be understood are skipped, so a
//! document that is pure garbage parses to zero groups and allows everything.

use std::time::Duration;

/// Whether a path rule grants or denies access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Allow,
    Disallow,
}

/// A single `Allow` or `Disallow` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRule {
    pub kind: RuleKind,
    /// Path pattern; `*` matches any run of characters, a trailing `$` anchors the end
    pub pattern: String,
}

impl PathRule {
    fn matches(&self, path: &str) -> bool {
        pattern_matches(&self.pattern, path)
    }

    /// Longer patterns are more specific
    fn specificity(&self) -> usize {
        self.pattern.len()
    }
}

/// A declared `Request-rate`: at most `requests` per `period`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestRate {
    pub requests: u32,
    pub period: Duration,
}

/// Rules declared for one set of `User-agent` lines
#[derive(Debug, Clone, Default)]
pub struct AgentGroup {
    /// Lowercased agent tokens this group applies to (`*` for everyone)
    pub agents: Vec<String>,
    /// Path rules in declaration order
    pub rules: Vec<PathRule>,
    pub crawl_delay: Option<Duration>,
    pub request_rate: Option<RequestRate>,
}

impl AgentGroup {
    fn is_wildcard(&self) -> bool {
        self.agents.iter().any(|ua| ua == "*")
    }

    fn names(&self, agent: &str) -> bool {
        self.agents
            .iter()
            .any(|ua| ua != "*" && agent.contains(ua.as_str()))
    }
}

/// Parsed robots.txt data
///
/// Holds every agent group in the order it was declared. Queries select the
/// groups naming the agent's product token, falling back to `*` groups.
#[derive(Debug, Clone, Default)]
pub struct ParsedRobots {
    groups: Vec<AgentGroup>,
}

impl ParsedRobots {
    /// Parses raw robots.txt content
    ///
    /// # Arguments
    ///
    /// * `content` - The raw robots.txt file content
    ///
    /// # Returns
    ///
    /// A ParsedRobots instance; unparseable lines are ignored
    pub fn from_content(content: &str) -> Self {
        let mut groups = Vec::new();
        let mut current: Option<AgentGroup> = None;
        // Consecutive User-agent lines share one group
        let mut reading_agents = false;

        for line in content.lines() {
            let line = match line.split_once('#') {
                Some((before, _)) => before,
                None => line,
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let Some((key, value)) = trimmed.split_once(':') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    if !reading_agents {
                        if let Some(group) = current.take() {
                            groups.push(group);
                        }
                        current = Some(AgentGroup::default());
                    }
                    reading_agents = true;
                    if let (Some(group), false) = (current.as_mut(), value.is_empty()) {
                        group.agents.push(value.to_lowercase());
                    }
                }
                "allow" | "disallow" => {
                    reading_agents = false;
                    let Some(group) = current.as_mut() else {
                        continue;
                    };
                    // An empty Disallow grants everything, which is the default anyway
                    if value.is_empty() {
                        continue;
                    }
                    let kind = if key == "allow" {
                        RuleKind::Allow
                    } else {
                        RuleKind::Disallow
                    };
                    group.rules.push(PathRule {
                        kind,
                        pattern: normalize_pattern(value),
                    });
                }
                "crawl-delay" => {
                    reading_agents = false;
                    if let (Some(group), Some(delay)) = (current.as_mut(), parse_crawl_delay(value))
                    {
                        group.crawl_delay = Some(delay);
                    }
                }
                "request-rate" => {
                    reading_agents = false;
                    if let (Some(group), Some(rate)) = (current.as_mut(), parse_request_rate(value))
                    {
                        group.request_rate = Some(rate);
                    }
                }
                _ => {
                    // Sitemap, Host and unknown extensions
                }
            }
        }

        if let Some(group) = current {
            groups.push(group);
        }

        Self { groups }
    }

    /// Creates a permissive ParsedRobots that allows everything
    ///
    /// Used when a site has no robots.txt.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Number of agent groups declared
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Groups that apply to `agent`
    fn groups_for(&self, agent: &str) -> Vec<&AgentGroup> {
        let agent = agent.to_lowercase();
        let specific: Vec<&AgentGroup> = self.groups.iter().filter(|g| g.names(&agent)).collect();
        if !specific.is_empty() {
            return specific;
        }
        self.groups.iter().filter(|g| g.is_wildcard()).collect()
    }

    /// Checks if a path is allowed for the given agent
    ///
    /// The matching rule with the longest pattern wins. Among equally long
    /// matches the one declared last wins. No matching rule means allowed.
    ///
    /// # Arguments
    ///
    /// * `path` - The URL path plus query (e.g., "/page.html?x=1")
    /// * `agent` - The agent product token
    pub fn is_allowed(&self, path: &str, agent: &str) -> bool {
        if path == "/robots.txt" {
            return true;
        }

        let mut best: Option<&PathRule> = None;
        for rule in self
            .groups_for(agent)
            .into_iter()
            .flat_map(|group| group.rules.iter())
        {
            if !rule.matches(path) {
                continue;
            }
            match best {
                Some(current) if rule.specificity() < current.specificity() => {}
                _ => best = Some(rule),
            }
        }

        best.map_or(true, |rule| rule.kind == RuleKind::Allow)
    }

    /// Gets the crawl delay for a specific agent
    ///
    /// # Returns
    ///
    /// * `Some(Duration)` - The declared crawl delay
    /// * `None` - If no applicable group declares one
    pub fn crawl_delay(&self, agent: &str) -> Option<Duration> {
        self.groups_for(agent)
            .into_iter()
            .find_map(|group| group.crawl_delay)
    }

    /// Gets the declared request rate for a specific agent
    pub fn request_rate(&self, agent: &str) -> Option<RequestRate> {
        self.groups_for(agent)
            .into_iter()
            .find_map(|group| group.request_rate)
    }
}

fn normalize_pattern(value: &str) -> String {
    if value.starts_with('/') || value.starts_with('*') {
        value.to_string()
    } else {
        format!("/{}", value)
    }
}

fn parse_crawl_delay(value: &str) -> Option<Duration> {
    let seconds: f64 = value.parse().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(seconds).ok()
}

/// Parses `n/period`, where period is seconds with an optional s/m/h suffix
fn parse_request_rate(value: &str) -> Option<RequestRate> {
    // Some sites append a visit-time window ("1/10s 0600-0845"); ignore it
    let value = value.split_whitespace().next()?;
    let (requests, period) = value.split_once('/')?;
    let requests: u32 = requests.trim().parse().ok()?;

    let period = period.trim().to_ascii_lowercase();
    let (number, unit) = match period.chars().last()? {
        's' => (&period[..period.len() - 1], 1),
        'm' => (&period[..period.len() - 1], 60),
        'h' => (&period[..period.len() - 1], 3600),
        _ => (period.as_str(), 1),
    };
    let number: u64 = number.trim().parse().ok()?;

    if requests == 0 || number == 0 {
        return None;
    }

    Some(RequestRate {
        requests,
        period: Duration::from_secs(number.checked_mul(unit)?),
    })
}

/// Matches a robots.txt path pattern against a request path
fn pattern_matches(pattern: &str, path: &str) -> bool {
    let (pattern, anchored) = match pattern.strip_suffix('$') {
        Some(stripped) => (stripped, true),
        None => (pattern, false),
    };

    let parts: Vec<&str> = pattern.split('*').collect();
    let first = parts[0];
    if !path.starts_with(first) {
        return false;
    }
    if parts.len() == 1 {
        return !anchored || path.len() == first.len();
    }

    let mut pos = first.len();
    let last_index = parts.len() - 1;
    for part in &parts[1..last_index] {
        match path[pos..].find(part) {
            Some(offset) => pos += offset + part.len(),
            None => return false,
        }
    }

    let last = parts[last_index];
    if anchored {
        path[pos..].ends_with(last)
    } else {
        path[pos..].contains(last)
    }
}
