use std::fmt;
use std::str::FromStr;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Semantic category a column can fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Likes,
    Comments,
    Reposts,
    Views,
    Content,
    Url,
    Timestamp,
    Author,
}

impl Role {
    pub const ALL: [Role; 8] = [
        Role::Likes,
        Role::Comments,
        Role::Reposts,
        Role::Views,
        Role::Content,
        Role::Url,
        Role::Timestamp,
        Role::Author,
    ];

    /// Roles summed into total interactions.
    pub const INTERACTIONS: [Role; 3] = [Role::Likes, Role::Comments, Role::Reposts];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Likes => "likes",
            Role::Comments => "comments",
            Role::Reposts => "reposts",
            Role::Views => "views",
            Role::Content => "content",
            Role::Url => "url",
            Role::Timestamp => "timestamp",
            Role::Author => "author",
        }
    }

    pub fn is_interaction(&self) -> bool {
        Self::INTERACTIONS.contains(self)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "likes" | "like" => Ok(Role::Likes),
            "comments" | "comment" => Ok(Role::Comments),
            "reposts" | "repost" | "shares" => Ok(Role::Reposts),
            "views" | "impressions" => Ok(Role::Views),
            "content" | "text" => Ok(Role::Content),
            "url" | "link" => Ok(Role::Url),
            "timestamp" | "date" => Ok(Role::Timestamp),
            "author" | "brand" => Ok(Role::Author),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Aliases and regex fragments for one role, in declaration order.
#[derive(Debug, Clone)]
pub struct RoleSpec {
    pub role: Role,
    pub aliases: Vec<String>,
    pub patterns: Vec<Regex>,
}

impl RoleSpec {
    fn new(role: Role, aliases: &[&str], patterns: &[&str]) -> Self {
        Self {
            role,
            aliases: aliases.iter().map(|alias| alias.to_string()).collect(),
            patterns: patterns
                .iter()
                .filter_map(|pattern| {
                    RegexBuilder::new(pattern)
                        .case_insensitive(true)
                        .build()
                        .ok()
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoleTaxonomy {
    specs: Vec<RoleSpec>,
}

impl RoleTaxonomy {
    pub fn spec(&self, role: Role) -> &RoleSpec {
        self.specs
            .iter()
            .find(|spec| spec.role == role)
            .unwrap_or_else(|| unreachable!("taxonomy covers every role"))
    }

    pub fn specs(&self) -> &[RoleSpec] {
        &self.specs
    }

    /// Appends aliases after the defaults so that built-in names keep
    /// priority in tie breaks.
    pub fn with_extra_aliases<I, S>(mut self, role: Role, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(spec) = self.specs.iter_mut().find(|spec| spec.role == role) {
            for alias in aliases {
                let alias = alias.into();
                if !spec.aliases.contains(&alias) {
                    spec.aliases.push(alias);
                }
            }
        }
        self
    }
}

impl Default for RoleTaxonomy {
    fn default() -> Self {
        let specs = vec![
            RoleSpec::new(
                Role::Likes,
                &[
                    "likeCount",
                    "likes",
                    "like_count",
                    "favorite_count",
                    "favourite_count",
                    "reactionCount",
                    "reactions",
                ],
                &["like", "favou?rite", "reaction"],
            ),
            RoleSpec::new(
                Role::Comments,
                &[
                    "commentCount",
                    "comments",
                    "comment_count",
                    "reply_count",
                    "replies",
                ],
                &["comment", "repl(y|ies)"],
            ),
            RoleSpec::new(
                Role::Reposts,
                &[
                    "repostCount",
                    "reposts",
                    "shares",
                    "shareCount",
                    "retweet_count",
                    "retweets",
                ],
                &["repost", "share", "retweet"],
            ),
            RoleSpec::new(
                Role::Views,
                &[
                    "impressions",
                    "views",
                    "reach",
                    "impressionCount",
                    "viewCount",
                    "impression_count",
                ],
                &["impression", "view", "reach"],
            ),
            RoleSpec::new(
                Role::Content,
                &[
                    "postContent",
                    "text",
                    "message",
                    "caption",
                    "content",
                    "full_text",
                    "body",
                ],
                &["content", "text", "message", "caption", "body"],
            ),
            RoleSpec::new(
                Role::Url,
                &["postUrl", "url", "link", "permalink"],
                &["url", "link", "permalink"],
            ),
            RoleSpec::new(
                Role::Timestamp,
                &[
                    "postTimestamp",
                    "created_at",
                    "createdTime",
                    "created_time",
                    "timestamp",
                    "date",
                    "date_time",
                ],
                &["timestamp", "date", "time", "created"],
            ),
            RoleSpec::new(
                Role::Author,
                &[
                    "author",
                    "authorName",
                    "page",
                    "company",
                    "account",
                    "brand",
                    "screen_name",
                ],
                &["author", "page", "company", "account", "brand"],
            ),
        ];
        Self { specs }
    }
}
