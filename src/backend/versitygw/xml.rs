//! # Admin API XML
//!
//! Request bodies sent to the gateway's admin endpoints and parsers for its
//! list responses.
//!
//! Request bodies:
//! - create-user: `<Account><Access/><Secret/><Role/>[<UserID/>][<GroupID/>]</Account>`
//! - update-user: `<MutableProps>[<Secret/>][<UserID/>][<GroupID/>]</MutableProps>`
//!
//! List responses carry repeated `Buckets` (`Name`, `Owner`) or `Accounts`
//! (`Access`, `Role`, `UserID`, `GroupID`) children under the root element.

use std::fmt::Write as _;

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::constants::DEFAULT_USER_ROLE;

/// Response body could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum XmlError {
    #[error("malformed XML: {0}")]
    Parse(String),

    #[error("XML document has no root element")]
    Empty,
}

/// One principal as written to (or read from) a create-user body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub access: String,
    pub secret: String,
    pub role: String,
    pub user_id: Option<i64>,
    pub group_id: Option<i64>,
}

/// One `Buckets` entry of a list-buckets response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketEntry {
    pub name: String,
    pub owner: Option<String>,
}

/// One `Accounts` entry of a list-users response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountEntry {
    pub access: String,
    pub role: Option<String>,
    pub user_id: Option<i64>,
    pub group_id: Option<i64>,
}

/// Body for `/create-user`; role defaults to `user`
pub fn create_user_body(
    access: &str,
    secret: &str,
    role: Option<&str>,
    user_id: Option<i64>,
    group_id: Option<i64>,
) -> String {
    let role = role.filter(|r| !r.is_empty()).unwrap_or(DEFAULT_USER_ROLE);
    let mut body = String::from("<Account>");
    push_element(&mut body, "Access", access);
    push_element(&mut body, "Secret", secret);
    push_element(&mut body, "Role", role);
    push_id(&mut body, "UserID", user_id);
    push_id(&mut body, "GroupID", group_id);
    body.push_str("</Account>");
    body
}

/// Body for `/update-user`; only supplied properties are included
pub fn update_user_body(secret: Option<&str>, user_id: Option<i64>, group_id: Option<i64>) -> String {
    let mut body = String::from("<MutableProps>");
    if let Some(secret) = secret {
        push_element(&mut body, "Secret", secret);
    }
    push_id(&mut body, "UserID", user_id);
    push_id(&mut body, "GroupID", group_id);
    body.push_str("</MutableProps>");
    body
}

fn push_element(body: &mut String, tag: &str, text: &str) {
    let _ = write!(body, "<{tag}>{}</{tag}>", escape(text));
}

fn push_id(body: &mut String, tag: &str, id: Option<i64>) {
    if let Some(id) = id {
        let _ = write!(body, "<{tag}>{id}</{tag}>");
    }
}

/// Parse a list-buckets response
pub fn parse_buckets(xml: &str) -> Result<Vec<BucketEntry>, XmlError> {
    let root = parse_document(xml)?;
    Ok(root
        .children_named("Buckets")
        .filter_map(|entry| {
            let name = entry.child_text("Name")?;
            Some(BucketEntry {
                name,
                owner: entry.child_text("Owner"),
            })
        })
        .collect())
}

/// Parse a list-users response
pub fn parse_accounts(xml: &str) -> Result<Vec<AccountEntry>, XmlError> {
    let root = parse_document(xml)?;
    Ok(root
        .children_named("Accounts")
        .filter_map(|entry| {
            let access = entry.child_text("Access")?;
            Some(AccountEntry {
                access,
                role: entry.child_text("Role"),
                user_id: entry.child_id("UserID"),
                group_id: entry.child_id("GroupID"),
            })
        })
        .collect())
}

/// Parse a create-user body back into an [`Account`]
pub fn parse_account(xml: &str) -> Result<Account, XmlError> {
    let root = parse_document(xml)?;
    if root.name != "Account" {
        return Err(XmlError::Parse(format!(
            "expected <Account> root, found <{}>",
            root.name
        )));
    }
    Ok(Account {
        access: root.child_text("Access").unwrap_or_default(),
        secret: root.child_text("Secret").unwrap_or_default(),
        role: root.child_text("Role").unwrap_or_default(),
        user_id: root.child_id("UserID"),
        group_id: root.child_id("GroupID"),
    })
}

/// Minimal element tree; attributes are not needed by any response we read
#[derive(Debug, Default)]
struct Element {
    name: String,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Trimmed text of the first child named `name`, if non-empty
    fn child_text(&self, name: &str) -> Option<String> {
        self.children_named(name)
            .next()
            .map(|child| child.text.trim().to_string())
            .filter(|text| !text.is_empty())
    }

    fn child_id(&self, name: &str) -> Option<i64> {
        self.child_text(name).and_then(|text| text.parse().ok())
    }
}

fn parse_document(xml: &str) -> Result<Element, XmlError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| XmlError::Parse(e.to_string()))?;
        match event {
            Event::Start(e) => {
                if root.is_some() {
                    return Err(XmlError::Parse("content after root element".to_string()));
                }
                stack.push(Element {
                    name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
                    ..Element::default()
                });
            }
            Event::Empty(e) => {
                let element = Element {
                    name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
                    ..Element::default()
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None if root.is_none() => root = Some(element),
                    None => return Err(XmlError::Parse("content after root element".to_string())),
                }
            }
            Event::Text(e) => {
                let text = e.unescape().map_err(|e| XmlError::Parse(e.to_string()))?;
                match stack.last_mut() {
                    Some(current) => current.text.push_str(&text),
                    None => return Err(XmlError::Parse("text outside root element".to_string())),
                }
            }
            Event::CData(e) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| XmlError::Parse("unbalanced end tag".to_string()))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(XmlError::Parse("unexpected end of document".to_string()));
    }
    root.ok_or(XmlError::Empty)
}
