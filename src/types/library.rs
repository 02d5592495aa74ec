//! Saved research artifacts: projects, sources and notes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ProjectRecord")]
pub struct Project {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    #[serde(default)]
    pub first_name: Option<String>,
    pub last_name: String,
}

impl Author {
    pub fn display_name(&self) -> String {
        match self.first_name.as_deref().filter(|s| !s.is_empty()) {
            Some(first) => format!("{first} {}", self.last_name),
            None => self.last_name.clone(),
        }
    }
}

/// A bibliographic source; `kind` is the CSL type (`book`, `article-journal`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "SourceRecord")]
pub struct Source {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Source {
    /// Short author-year label, e.g. `Lovelace & Babbage (1843)`.
    pub fn citation_label(&self) -> String {
        let authors = match self.authors.as_slice() {
            [] => "Anonymous".to_string(),
            [one] => one.last_name.clone(),
            [first, second] => format!("{} & {}", first.last_name, second.last_name),
            [first, ..] => format!("{} et al.", first.last_name),
        };
        match self.year.as_deref() {
            Some(year) if !year.is_empty() => format!("{authors} ({year})"),
            _ => format!("{authors} (n.d.)"),
        }
    }
}

/// A note taken on a source. `content` is rich text as stored by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "NoteRecord")]
pub struct Note {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Both id spellings as sent on the wire. Documents carry `_id`; those
/// serialized with virtuals carry `id` as well.
#[derive(Debug, Default, Deserialize)]
struct RecordId {
    #[serde(rename = "_id", default)]
    object_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
}

impl RecordId {
    fn resolve(self, what: &str) -> Result<String, String> {
        self.object_id
            .or(self.id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| format!("{what} has no _id or id"))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectRecord {
    #[serde(flatten)]
    ids: RecordId,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<ProjectRecord> for Project {
    type Error = String;

    fn try_from(record: ProjectRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.ids.resolve("project")?,
            name: record.name,
            description: record.description,
            user: record.user,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SourceRecord {
    #[serde(flatten)]
    ids: RecordId,
    #[serde(default)]
    project: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    title: String,
    #[serde(default)]
    authors: Vec<Author>,
    #[serde(default)]
    year: Option<String>,
    #[serde(default)]
    publisher: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<SourceRecord> for Source {
    type Error = String;

    fn try_from(record: SourceRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.ids.resolve("source")?,
            project: record.project,
            user: record.user,
            kind: record.kind,
            title: record.title,
            authors: record.authors,
            year: record.year,
            publisher: record.publisher,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NoteRecord {
    #[serde(flatten)]
    ids: RecordId,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    project: Option<String>,
    #[serde(default)]
    user: Option<String>,
    content: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<NoteRecord> for Note {
    type Error = String;

    fn try_from(record: NoteRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.ids.resolve("note")?,
            source: record.source,
            project: record.project,
            user: record.user,
            content: record.content,
            tags: record.tags,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn author(first: Option<&str>, last: &str) -> Author {
        Author {
            first_name: first.map(String::from),
            last_name: last.to_string(),
        }
    }

    #[test]
    fn project_reads_mongo_style_ids() {
        let project: Project = serde_json::from_value(json!({
            "_id": "68f3da6f1394573cdd278c2e",
            "name": "Thesis",
            "user": "u1",
            "createdAt": "2024-05-01T10:00:00.000Z"
        }))
        .unwrap();
        assert_eq!(project.id, "68f3da6f1394573cdd278c2e");
        assert!(project.created_at.is_some());
        assert!(project.description.is_none());
    }

    #[test]
    fn source_type_maps_to_kind() {
        let source: Source = serde_json::from_value(json!({
            "id": "s1",
            "type": "book",
            "title": "Notes on the Analytical Engine",
            "authors": [{ "firstName": "Ada", "lastName": "Lovelace" }],
            "year": "1843"
        }))
        .unwrap();
        assert_eq!(source.kind.as_deref(), Some("book"));
        assert_eq!(source.authors[0].display_name(), "Ada Lovelace");
    }

    #[test]
    fn citation_label_variants() {
        let mut source: Source = serde_json::from_value(json!({ "_id": "s1", "title": "T" })).unwrap();
        assert_eq!(source.citation_label(), "Anonymous (n.d.)");

        source.year = Some("1843".into());
        source.authors = vec![author(Some("Ada"), "Lovelace")];
        assert_eq!(source.citation_label(), "Lovelace (1843)");

        source.authors.push(author(None, "Babbage"));
        assert_eq!(source.citation_label(), "Lovelace & Babbage (1843)");

        source.authors.push(author(None, "Menabrea"));
        assert_eq!(source.citation_label(), "Lovelace et al. (1843)");
    }

    #[test]
    fn records_with_both_id_spellings_are_accepted() {
        let project: Project = serde_json::from_value(json!({
            "_id": "p1",
            "id": "p1",
            "name": "Thesis"
        }))
        .unwrap();
        assert_eq!(project.id, "p1");

        let note: Note = serde_json::from_value(json!({
            "_id": "n1",
            "id": "n1",
            "content": "quote",
            "__v": 0
        }))
        .unwrap();
        assert_eq!(note.id, "n1");
    }

    #[test]
    fn record_without_any_id_is_rejected() {
        let err = serde_json::from_value::<Source>(json!({ "title": "T" })).unwrap_err();
        assert!(err.to_string().contains("source has no _id or id"));
    }

    #[test]
    fn serialized_ids_use_object_id_key() {
        let project: Project = serde_json::from_value(json!({ "id": "p1", "name": "Thesis" })).unwrap();
        let value = serde_json::to_value(&project).unwrap();
        assert_eq!(value["_id"], "p1");
        assert!(value.get("id").is_none());
    }

    #[test]
    fn note_tags_default_to_empty() {
        let note: Note = serde_json::from_value(json!({
            "_id": "n1",
            "content": "<p>quote</p>"
        }))
        .unwrap();
        assert!(note.tags.is_empty());
    }
}
