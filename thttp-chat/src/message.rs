//! THTTP ("trivial hypertext transfer protocol") requests and responses.
//!
//! Both message kinds share one text layout inside a frame:
//!
//! ```text
//! <start-line>\r\n
//! [<name>: <value>\r\n]*
//! \r\n
//! <body>
//! ```
//!
//! Parsing is lenient and never fails; `validate` decides whether the parsed
//! message is acceptable and yields its typed [`Method`] or [`Status`].

use std::fmt;
use std::str::FromStr;

use crate::error::MessageError;
use crate::frame::FrameCodec;

pub const VERSION: &str = "THTTP/1.1";

const NEW_LINE: &str = "\r\n";
const HEADER_SEPARATOR: &str = ": ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    SignIn,
    SignOut,
    Join,
    Leave,
    Send,
}

impl Method {
    pub const ALL: [Method; 5] = [
        Method::SignIn,
        Method::SignOut,
        Method::Join,
        Method::Leave,
        Method::Send,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::SignIn => "signin",
            Method::SignOut => "signout",
            Method::Join => "join",
            Method::Leave => "leave",
            Method::Send => "send",
        }
    }

    /// Status codes answered on success and on a state conflict.
    pub fn statuses(&self) -> (Status, Status) {
        match self {
            Method::SignIn => (Status::SignInOk, Status::SignInError),
            Method::SignOut => (Status::SignOutOk, Status::SignOutError),
            Method::Join => (Status::JoinOk, Status::JoinError),
            Method::Leave => (Status::LeaveOk, Status::LeaveError),
            Method::Send => (Status::Chat, Status::SendError),
        }
    }
}

impl FromStr for Method {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        Method::ALL
            .into_iter()
            .find(|method| method.as_str() == lowered)
            .ok_or(MessageError::UnknownMethod(lowered))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    SignInOk,
    SignOutOk,
    JoinOk,
    LeaveOk,
    Members,
    Chat,
    SignInError,
    SignOutError,
    JoinError,
    LeaveError,
    SendError,
    BadRequest,
}

impl Status {
    pub const ALL: [Status; 12] = [
        Status::SignInOk,
        Status::SignOutOk,
        Status::JoinOk,
        Status::LeaveOk,
        Status::Members,
        Status::Chat,
        Status::SignInError,
        Status::SignOutError,
        Status::JoinError,
        Status::LeaveError,
        Status::SendError,
        Status::BadRequest,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Status::SignInOk => "200",
            Status::SignOutOk => "201",
            Status::JoinOk => "202",
            Status::LeaveOk => "203",
            Status::Members => "204",
            Status::Chat => "205",
            Status::SignInError => "300",
            Status::SignOutError => "301",
            Status::JoinError => "302",
            Status::LeaveError => "303",
            Status::SendError => "305",
            Status::BadRequest => "400",
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Status::SignInOk => "Sign in success",
            Status::SignOutOk => "Sign out success",
            Status::JoinOk => "Join group success",
            Status::LeaveOk => "Leave group success",
            Status::Members => "Group members",
            Status::Chat => "Send chat success",
            Status::SignInError => "Sign in error",
            Status::SignOutError => "Sign out error",
            Status::JoinError => "Join group error",
            Status::LeaveError => "Leave group error",
            Status::SendError => "Send chat error",
            Status::BadRequest => "Wrong format request",
        }
    }

    pub fn from_code(code: &str) -> Option<Status> {
        Status::ALL.into_iter().find(|status| status.code() == code)
    }

    pub fn is_success(&self) -> bool {
        self.code().starts_with('2')
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    /// `None` when the source line had no `": "` separator.
    pub value: Option<String>,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    fn parse(line: &str) -> Self {
        match line.split_once(HEADER_SEPARATOR) {
            Some((name, value)) => Header::new(name, value),
            None => Self {
                name: line.to_string(),
                value: None,
            },
        }
    }

    fn check(&self) -> Result<(), MessageError> {
        match self.value {
            Some(_) => Ok(()),
            None => Err(MessageError::MalformedHeader(self.name.clone())),
        }
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}{HEADER_SEPARATOR}{}", self.name, value),
            None => f.write_str(&self.name),
        }
    }
}

/// Layout shared by requests and responses.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Envelope {
    start_line: [String; 3],
    headers: Vec<Header>,
    body: String,
}

impl Envelope {
    fn parse(payload: &str) -> Self {
        let lines: Vec<&str> = payload.split(NEW_LINE).collect();

        let mut fields = lines[0].splitn(3, ' ').map(str::to_string);
        let start_line = [
            fields.next().unwrap_or_default(),
            fields.next().unwrap_or_default(),
            fields.next().unwrap_or_default(),
        ];

        // Headers sit between the start line and the blank line before the body.
        let header_end = lines.len().saturating_sub(2).max(1);
        let headers = lines[1..header_end]
            .iter()
            .map(|line| Header::parse(line))
            .collect();

        let body = if lines.len() > 1 {
            lines[lines.len() - 1].trim().to_string()
        } else {
            String::new()
        };

        Self {
            start_line,
            headers,
            body,
        }
    }

    fn serialize(&self) -> String {
        let mut text = self.start_line.join(" ");
        text.push_str(NEW_LINE);
        if !self.headers.is_empty() {
            let headers: Vec<String> = self.headers.iter().map(Header::to_string).collect();
            text.push_str(&headers.join(NEW_LINE));
            text.push_str(NEW_LINE);
        }
        text.push_str(NEW_LINE);
        text.push_str(&self.body);
        text
    }

    fn check_start_line(&self) -> Result<(), MessageError> {
        if self.start_line.iter().all(|field| field.trim().is_empty()) {
            return Err(MessageError::EmptyStartLine);
        }
        Ok(())
    }

    fn check_headers(&self) -> Result<(), MessageError> {
        self.headers.iter().try_for_each(Header::check)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    envelope: Envelope,
}

impl Request {
    pub fn new(method: Method, body: impl Into<String>) -> Self {
        Self {
            envelope: Envelope {
                start_line: [method.as_str().to_string(), "/".to_string(), VERSION.to_string()],
                headers: Vec::new(),
                body: body.into(),
            },
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.envelope.start_line[1] = target.into();
        self
    }

    pub fn with_header(mut self, header: Header) -> Self {
        self.envelope.headers.push(header);
        self
    }

    /// Parses a frame payload. The method is lowercased; nothing is validated.
    pub fn parse(payload: &str) -> Self {
        let mut envelope = Envelope::parse(payload);
        envelope.start_line[0] = envelope.start_line[0].to_ascii_lowercase();
        Self { envelope }
    }

    /// Checks method, version and headers, returning the typed method.
    pub fn validate(&self) -> Result<Method, MessageError> {
        self.envelope.check_start_line()?;
        let method = self.method().parse::<Method>()?;
        if self.version() != VERSION {
            return Err(MessageError::VersionMismatch(self.version().to_string()));
        }
        self.envelope.check_headers()?;
        Ok(method)
    }

    pub fn method(&self) -> &str {
        &self.envelope.start_line[0]
    }

    pub fn target(&self) -> &str {
        &self.envelope.start_line[1]
    }

    pub fn version(&self) -> &str {
        &self.envelope.start_line[2]
    }

    pub fn headers(&self) -> &[Header] {
        &self.envelope.headers
    }

    pub fn body(&self) -> &str {
        &self.envelope.body
    }

    pub fn serialize(&self) -> String {
        self.envelope.serialize()
    }

    pub fn encode(&self, codec: &FrameCodec) -> Vec<u8> {
        codec.encode(&self.serialize())
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.method(), self.target(), self.body())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    envelope: Envelope,
}

impl Response {
    pub fn new(status: Status, body: impl Into<String>) -> Self {
        Self {
            envelope: Envelope {
                start_line: [
                    VERSION.to_string(),
                    status.code().to_string(),
                    status.reason().to_string(),
                ],
                headers: Vec::new(),
                body: body.into(),
            },
        }
    }

    /// Builds a response from a raw code, falling back to 400 for unknown codes.
    pub fn from_code(code: &str, body: impl Into<String>) -> Self {
        Self::new(Status::from_code(code).unwrap_or(Status::BadRequest), body)
    }

    pub fn with_header(mut self, header: Header) -> Self {
        self.envelope.headers.push(header);
        self
    }

    pub fn parse(payload: &str) -> Self {
        Self {
            envelope: Envelope::parse(payload),
        }
    }

    /// Checks version, status code and that the reason phrase belongs to the code.
    pub fn validate(&self) -> Result<Status, MessageError> {
        self.envelope.check_start_line()?;
        if self.version() != VERSION {
            return Err(MessageError::VersionMismatch(self.version().to_string()));
        }
        let status = Status::from_code(self.code())
            .ok_or_else(|| MessageError::UnknownStatus(self.code().to_string()))?;
        if self.reason() != status.reason() {
            return Err(MessageError::ReasonMismatch);
        }
        Ok(status)
    }

    pub fn version(&self) -> &str {
        &self.envelope.start_line[0]
    }

    pub fn code(&self) -> &str {
        &self.envelope.start_line[1]
    }

    pub fn reason(&self) -> &str {
        &self.envelope.start_line[2]
    }

    pub fn headers(&self) -> &[Header] {
        &self.envelope.headers
    }

    pub fn body(&self) -> &str {
        &self.envelope.body
    }

    pub fn serialize(&self) -> String {
        self.envelope.serialize()
    }

    pub fn encode(&self, codec: &FrameCodec) -> Vec<u8> {
        codec.encode(&self.serialize())
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.code(), self.reason(), self.body())
    }
}
