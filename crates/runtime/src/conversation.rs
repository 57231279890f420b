use crate::request::RequestId;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub seq: u64,
    pub role: Role,
    pub text: String,
    pub request: Option<RequestId>,
}

/// Question/answer log shown next to the map. Errors are logged here inline
/// rather than interrupting the view.
#[derive(Debug, Default)]
pub struct Conversation {
    next_seq: u64,
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, role: Role, text: impl Into<String>, request: Option<RequestId>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.messages.push(Message {
            seq,
            role,
            text: text.into(),
            request,
        });
    }

    pub fn user(&mut self, text: impl Into<String>, request: Option<RequestId>) {
        self.push(Role::User, text, request);
    }

    pub fn assistant(&mut self, text: impl Into<String>, request: Option<RequestId>) {
        self.push(Role::Assistant, text, request);
    }

    pub fn error(&mut self, text: impl Into<String>, request: Option<RequestId>) {
        self.push(Role::Error, text, request);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
