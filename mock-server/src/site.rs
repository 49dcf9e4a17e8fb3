//! In-memory model of one SharePoint web.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

/// A column, serialized the way `fields` endpoints return it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Field {
    pub id: Uuid,
    pub title: String,
    pub internal_name: String,
    pub field_type_kind: i64,
    pub schema_xml: String,
    pub group: String,
    pub required: bool,
}

impl Field {
    pub fn new(title: &str, field_type_kind: i64) -> Self {
        let id = Uuid::new_v4();
        let internal_name = title.replace(' ', "_x0020_");
        Self {
            id,
            title: title.to_string(),
            schema_xml: format!(
                r#"<Field ID="{{{id}}}" Name="{}" DisplayName="{}" FieldTypeKind="{field_type_kind}" />"#,
                xml_escape(&internal_name),
                xml_escape(title)
            ),
            internal_name,
            field_type_kind,
            group: String::new(),
            required: false,
        }
    }
}

fn xml_escape(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;").replace('<', "&lt;")
}

#[derive(Debug, Clone)]
pub struct View {
    pub id: Uuid,
    pub title: String,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SpList {
    pub id: Uuid,
    pub title: String,
    pub base_template: i64,
    pub description: String,
    pub entity_type: String,
    pub fields: Vec<Field>,
    pub items: Vec<Map<String, Value>>,
    pub files: Vec<Value>,
    pub folders: Vec<String>,
    pub views: Vec<View>,
    next_item_id: i64,
}

impl SpList {
    pub fn new(title: &str, base_template: i64, description: &str) -> Self {
        let encoded = title.replace(' ', "_x0020_");
        let entity_type = if base_template == 100 {
            format!("SP.Data.{encoded}ListItem")
        } else {
            format!("SP.Data.{encoded}Item")
        };
        Self {
            id: Uuid::new_v4(),
            title: title.to_string(),
            base_template,
            description: description.to_string(),
            entity_type,
            fields: vec![Field::new("Title", 2)],
            items: Vec::new(),
            files: Vec::new(),
            folders: Vec::new(),
            views: vec![View {
                id: Uuid::new_v4(),
                title: "All Items".to_string(),
                fields: vec!["LinkTitle".to_string()],
            }],
            next_item_id: 1,
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "Id": self.id,
            "Title": self.title,
            "BaseTemplate": self.base_template,
            "Description": self.description,
            "ListItemEntityTypeFullName": self.entity_type,
            "ItemCount": self.items.len(),
        })
    }

    pub fn field(&self, title: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.title.eq_ignore_ascii_case(title))
    }

    pub fn view_mut(&mut self, title: &str) -> Option<&mut View> {
        self.views.iter_mut().find(|v| v.title.eq_ignore_ascii_case(title))
    }

    pub fn item_mut(&mut self, id: i64) -> Option<&mut Map<String, Value>> {
        self.items.iter_mut().find(|item| item.get("Id").and_then(Value::as_i64) == Some(id))
    }

    /// Stores `values` as a new item and returns it with its ids assigned.
    pub fn add_item(&mut self, mut values: Map<String, Value>) -> Map<String, Value> {
        let id = self.next_item_id;
        self.next_item_id += 1;
        values.insert("Id".to_string(), json!(id));
        values.insert("ID".to_string(), json!(id));
        values.entry("FileSystemObjectType").or_insert(json!(0));
        self.items.push(values.clone());
        values
    }

    /// Seeds a document into a library.
    pub fn add_file(&mut self, name: &str) -> Value {
        let file = json!({
            "Name": name,
            "ServerRelativeUrl": format!("/{}/{name}", self.title),
            "UniqueId": Uuid::new_v4(),
            "Length": 0,
        });
        self.files.push(file.clone());
        file
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct User {
    pub id: i64,
    pub title: String,
    pub email: String,
    pub login_name: String,
}

impl User {
    pub fn new(id: i64, title: &str, email: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            email: email.to_string(),
            login_name: format!("i:0#.f|membership|{email}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Group {
    pub name: String,
    pub users: Vec<User>,
}

/// A request as the server understood it, with MERGE/PATCH overrides
/// applied to `method`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct Site {
    pub lists: Vec<SpList>,
    pub site_fields: Vec<Field>,
    pub groups: Vec<Group>,
    pub current_user: User,
    pub requests: Vec<RecordedRequest>,
    /// Lists created through the API, seeded lists excluded.
    pub lists_created: u32,
}

impl Site {
    pub fn new() -> Self {
        let admin = User::new(1, "Site Admin", "admin@contoso.com");
        Self {
            lists: Vec::new(),
            site_fields: Vec::new(),
            groups: vec![Group {
                name: "Owners".to_string(),
                users: vec![admin.clone()],
            }],
            current_user: admin,
            requests: Vec::new(),
            lists_created: 0,
        }
    }

    pub fn list(&self, title: &str) -> Option<&SpList> {
        self.lists.iter().find(|l| l.title.eq_ignore_ascii_case(title))
    }

    pub fn list_mut(&mut self, title: &str) -> Option<&mut SpList> {
        self.lists.iter_mut().find(|l| l.title.eq_ignore_ascii_case(title))
    }

    /// Seeds a list without counting it as created.
    pub fn add_list(&mut self, title: &str, base_template: i64) -> &mut SpList {
        self.lists.push(SpList::new(title, base_template, ""));
        let last = self.lists.len() - 1;
        &mut self.lists[last]
    }

    pub fn add_group(&mut self, name: &str, users: Vec<User>) {
        self.groups.push(Group {
            name: name.to_string(),
            users,
        });
    }

    /// Number of recorded requests whose path contains `fragment`
    /// (case-insensitive).
    pub fn requests_to(&self, fragment: &str) -> usize {
        let fragment = fragment.to_ascii_lowercase();
        self.requests
            .iter()
            .filter(|r| r.path.to_ascii_lowercase().contains(&fragment))
            .count()
    }
}

impl Default for Site {
    fn default() -> Self {
        Self::new()
    }
}
