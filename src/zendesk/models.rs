//! Zendesk API records and the shapes the tools return.
//!
//! The same structs deserialize from the REST API and serialize into tool
//! output; unknown upstream fields are ignored and missing ones become `null`.

use std::ops::Index;

use serde::{Deserialize, Serialize, Serializer};

use crate::types::SectionName;

/// Full ticket, as returned by `get_ticket`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: u64,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub requester_id: Option<u64>,
    #[serde(default)]
    pub assignee_id: Option<u64>,
    #[serde(default)]
    pub organization_id: Option<u64>,
}

/// Ticket row used by listings and search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketSummary {
    pub id: u64,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub requester_id: Option<u64>,
    #[serde(default)]
    pub assignee_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    #[serde(default)]
    pub author_id: Option<u64>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub html_body: Option<String>,
    #[serde(default)]
    pub public: Option<bool>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub organization_id: Option<u64>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub time_zone: Option<String>,
}

/// Help Center section as listed upstream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Section {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Help Center article. Upstream calls the link `html_url`; the knowledge
/// base document calls it `url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, rename(deserialize = "html_url", serialize = "url"))]
    pub url: Option<String>,
}

/// One section of the knowledge base with its articles in upstream order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeBaseSection {
    pub section_id: u64,
    pub description: Option<String>,
    pub articles: Vec<Article>,
}

/// Section name to section contents, in the order upstream lists sections.
///
/// Serializes as a JSON object whose keys keep that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnowledgeBase {
    sections: Vec<(SectionName, KnowledgeBaseSection)>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a section. A section with the same name is replaced in place and
    /// returned.
    pub fn insert(
        &mut self,
        name: SectionName,
        section: KnowledgeBaseSection,
    ) -> Option<KnowledgeBaseSection> {
        match self.sections.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => Some(std::mem::replace(existing, section)),
            None => {
                self.sections.push((name, section));
                None
            }
        }
    }

    pub fn get(&self, name: &SectionName) -> Option<&KnowledgeBaseSection> {
        self.sections
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, section)| section)
    }

    pub fn contains_key(&self, name: &SectionName) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SectionName, &KnowledgeBaseSection)> {
        self.sections.iter().map(|(name, section)| (name, section))
    }

    pub fn values(&self) -> impl Iterator<Item = &KnowledgeBaseSection> {
        self.sections.iter().map(|(_, section)| section)
    }
}

impl Index<&SectionName> for KnowledgeBase {
    type Output = KnowledgeBaseSection;

    fn index(&self, name: &SectionName) -> &KnowledgeBaseSection {
        match self.get(name) {
            Some(section) => section,
            None => panic!("no knowledge base section named '{}'", name),
        }
    }
}

impl Serialize for KnowledgeBase {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// Total number of articles across all sections.
pub fn total_articles(kb: &KnowledgeBase) -> usize {
    kb.values().map(|s| s.articles.len()).sum()
}
