// ABOUTME: Canonical conversation model shared by the agent engine and every provider adapter.
// ABOUTME: Messages serialize to the OpenAI chat wire shape; tool calls accept nested and flat forms.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ulid::Ulid;

/// Who authored a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    /// Wire label for this role.
    pub fn label(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Reference to an image, either a remote URL or a `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// One typed block of a structured message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn image(url: impl Into<String>) -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrl { url: url.into() },
        }
    }
}

/// Message body: plain text, or an ordered list of typed parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl Content {
    /// Concatenate every text block. Image blocks contribute nothing.
    pub fn to_text(&self) -> String {
        match self {
            Content::Text(text) => text.clone(),
            Content::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Borrow the body as a list of parts, wrapping plain text in a single text part.
    pub fn parts(&self) -> Vec<ContentPart> {
        match self {
            Content::Text(text) => vec![ContentPart::text(text.clone())],
            Content::Parts(parts) => parts.clone(),
        }
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

/// A request, emitted by the model, to invoke a named local tool.
///
/// `arguments` holds the serialized argument object exactly as the backend sent it;
/// decoding happens at dispatch so a malformed payload can still be answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawToolCall", into = "WireToolCall")]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Build a call for a backend that does not assign ids of its own.
    pub fn with_generated_id(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self::new(generate_call_id(), name, arguments)
    }

    /// Accept either the nested `{id, function: {name, arguments}}` shape or the flat
    /// `{id, name, arguments}` shape. Returns `None` when no function name is present.
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

/// Opaque id for a tool call synthesized locally.
pub fn generate_call_id() -> String {
    format!("call_{}", Ulid::new())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawToolCall {
    Nested {
        #[serde(default)]
        id: Option<String>,
        function: RawFunction,
    },
    Flat {
        #[serde(default)]
        id: Option<String>,
        name: String,
        #[serde(default)]
        arguments: Value,
    },
}

#[derive(Deserialize)]
struct RawFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

fn arguments_to_string(arguments: Value) -> String {
    match arguments {
        Value::String(raw) => raw,
        Value::Null => "{}".to_string(),
        structured => structured.to_string(),
    }
}

impl From<RawToolCall> for ToolCallRequest {
    fn from(raw: RawToolCall) -> Self {
        let (id, name, arguments) = match raw {
            RawToolCall::Nested { id, function } => (id, function.name, function.arguments),
            RawToolCall::Flat {
                id,
                name,
                arguments,
            } => (id, name, arguments),
        };
        Self {
            id: id.filter(|id| !id.is_empty()).unwrap_or_else(generate_call_id),
            name,
            arguments: arguments_to_string(arguments),
        }
    }
}

#[derive(Serialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction,
}

#[derive(Serialize)]
struct WireFunction {
    name: String,
    arguments: String,
}

impl From<ToolCallRequest> for WireToolCall {
    fn from(call: ToolCallRequest) -> Self {
        Self {
            id: call.id,
            kind: "function",
            function: WireFunction {
                name: call.name,
                arguments: call.arguments,
            },
        }
    }
}

/// One entry of an agent's conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRequest>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn plain(role: Role, content: Content) -> Self {
        Self {
            role,
            content: Some(content),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::plain(Role::System, Content::Text(text.into()))
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::plain(Role::User, Content::Text(text.into()))
    }

    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self::plain(Role::User, Content::Parts(parts))
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, Content::Text(text.into()))
    }

    /// Assistant turn that requests tools. `content` may be absent.
    pub fn assistant_tool_calls(content: Option<String>, calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.map(Content::Text),
            tool_calls: Some(calls),
            tool_call_id: None,
        }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(Content::Text(content.into())),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Build a user turn carrying attachments. Without attachments this is a plain
    /// text message; otherwise one text part (with non-image attachments inlined)
    /// followed by one image part per image attachment.
    pub fn user_with_attachments(text: impl Into<String>, attachments: &[Attachment]) -> Self {
        let text = text.into();
        if attachments.is_empty() {
            return Self::user(text);
        }

        let mut body = text;
        let mut images = Vec::new();
        for attachment in attachments {
            if attachment.is_image() {
                images.push(ContentPart::image(attachment.content.clone()));
            } else {
                body.push_str(&format!(
                    "\n\n--- [Attachment: {}] ---\n{}\n--- [End Attachment] ---",
                    attachment.name, attachment.content
                ));
            }
        }

        let mut parts = vec![ContentPart::text(body)];
        parts.extend(images);
        Self::user_parts(parts)
    }

    /// Flattened text of the message body, if any.
    pub fn text(&self) -> Option<String> {
        self.content.as_ref().map(Content::to_text)
    }

    /// Tool calls carried by this message (empty for anything but assistant turns).
    pub fn calls(&self) -> &[ToolCallRequest] {
        self.tool_calls.as_deref().unwrap_or(&[])
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.calls().is_empty()
    }
}

/// A file handed to the agent alongside a user message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Text content, or a URL / data URL for images.
    pub content: String,
}

impl Attachment {
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            content: content.into(),
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn messages_serialize_to_openai_shape() {
        let call = ToolCallRequest::new("call_1", "list_agents", "{}");
        let msg = Message::assistant_tool_calls(None, vec![call]);
        let value = serde_json::to_value(&msg).unwrap();

        assert_eq!(value["role"], "assistant");
        assert!(value["content"].is_null());
        assert_eq!(value["tool_calls"][0]["id"], "call_1");
        assert_eq!(value["tool_calls"][0]["type"], "function");
        assert_eq!(value["tool_calls"][0]["function"]["name"], "list_agents");
        assert_eq!(value["tool_calls"][0]["function"]["arguments"], "{}");
        assert!(value.get("tool_call_id").is_none());

        let tool = serde_json::to_value(Message::tool("call_1", "ok")).unwrap();
        assert_eq!(tool["role"], "tool");
        assert_eq!(tool["tool_call_id"], "call_1");
        assert_eq!(tool["content"], "ok");
    }

    #[test]
    fn tool_call_accepts_nested_shape() {
        let call = ToolCallRequest::from_value(&json!({
            "id": "x",
            "type": "function",
            "function": {"name": "t", "arguments": "{\"a\": 1}"}
        }))
        .unwrap();

        assert_eq!(call.id, "x");
        assert_eq!(call.name, "t");
        assert_eq!(call.arguments, "{\"a\": 1}");
    }

    #[test]
    fn tool_call_accepts_flat_shape_with_structured_arguments() {
        let call = ToolCallRequest::from_value(&json!({
            "id": "y",
            "name": "delegate_task",
            "arguments": {"to_agent": "Coder", "task": "write"}
        }))
        .unwrap();

        assert_eq!(call.id, "y");
        assert_eq!(call.name, "delegate_task");
        let decoded: Value = serde_json::from_str(&call.arguments).unwrap();
        assert_eq!(decoded["to_agent"], "Coder");
    }

    #[test]
    fn tool_call_without_id_gets_generated_one() {
        let call = ToolCallRequest::from_value(&json!({"name": "list_agents"})).unwrap();
        assert!(call.id.starts_with("call_"));
        assert_eq!(call.arguments, "{}");
    }

    #[test]
    fn tool_call_without_name_is_rejected() {
        assert!(ToolCallRequest::from_value(&json!({"id": "z"})).is_none());
    }

    #[test]
    fn malformed_arguments_survive_deserialization() {
        let call = ToolCallRequest::from_value(&json!({
            "id": "x",
            "function": {"name": "t", "arguments": "{bad json"}
        }))
        .unwrap();
        assert_eq!(call.arguments, "{bad json");
    }

    #[test]
    fn structured_content_round_trips_through_wire_shape() {
        let msg = Message::user_parts(vec![
            ContentPart::text("look"),
            ContentPart::image("data:image/png;base64,1234"),
        ]);
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["content"][0]["type"], "text");
        assert_eq!(value["content"][1]["type"], "image_url");
        assert_eq!(
            value["content"][1]["image_url"]["url"],
            "data:image/png;base64,1234"
        );

        let back: Message = serde_json::from_value(value).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn image_attachment_becomes_image_part() {
        let attachments = [Attachment::new(
            "test.png",
            "image/png",
            "data:image/png;base64,1234",
        )];
        let msg = Message::user_with_attachments("Look at this", &attachments);

        let Some(Content::Parts(parts)) = &msg.content else {
            panic!("expected structured content, got {:?}", msg.content);
        };
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], ContentPart::text("Look at this"));
        assert_eq!(parts[1], ContentPart::image("data:image/png;base64,1234"));
    }

    #[test]
    fn text_attachment_is_inlined() {
        let attachments = [Attachment::new("notes.txt", "text/plain", "Hello World")];
        let msg = Message::user_with_attachments("Read this", &attachments);

        let Some(Content::Parts(parts)) = &msg.content else {
            panic!("expected structured content, got {:?}", msg.content);
        };
        assert_eq!(parts.len(), 1);
        let text = msg.text().unwrap();
        assert!(text.starts_with("Read this"));
        assert!(text.contains("[Attachment: notes.txt]"));
        assert!(text.contains("Hello World"));
    }

    #[test]
    fn no_attachments_means_plain_text() {
        let msg = Message::user_with_attachments("hi", &[]);
        assert_eq!(msg.content, Some(Content::Text("hi".to_string())));
    }
}
