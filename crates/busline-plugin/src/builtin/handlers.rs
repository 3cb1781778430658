// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use busline_core::{BuslineError, CommandMessage, Handler, Payload};

use super::{wrong_form, ReplySettings};

/// Replies with the inbound text reversed.
#[derive(Debug)]
pub struct ReverseString {
    message_name: String,
    reply: ReplySettings,
}

impl ReverseString {
    pub fn new(message_name: &str, reply: ReplySettings) -> Self {
        Self {
            message_name: message_name.to_string(),
            reply,
        }
    }
}

impl Handler for ReverseString {
    fn message_name(&self) -> &str {
        &self.message_name
    }

    fn execute(&self, message: &CommandMessage) -> Result<Option<CommandMessage>, BuslineError> {
        let text = message
            .payload()
            .as_text()
            .ok_or_else(|| wrong_form(self.name(), message, "text"))?;
        let reversed: String = text.chars().rev().collect();
        self.reply.reply(&self.message_name, reversed).map(Some)
    }

    fn name(&self) -> &str {
        "reverse_string"
    }
}

/// Replies with the inbound integer plus a fixed addend.
#[derive(Debug)]
pub struct AddInteger {
    message_name: String,
    addend: i64,
    reply: ReplySettings,
}

impl AddInteger {
    pub fn new(message_name: &str, addend: i64, reply: ReplySettings) -> Self {
        Self {
            message_name: message_name.to_string(),
            addend,
            reply,
        }
    }
}

impl Handler for AddInteger {
    fn message_name(&self) -> &str {
        &self.message_name
    }

    fn execute(&self, message: &CommandMessage) -> Result<Option<CommandMessage>, BuslineError> {
        let value = message
            .payload()
            .as_integer()
            .ok_or_else(|| wrong_form(self.name(), message, "integer"))?;
        let sum = value.checked_add(self.addend).ok_or_else(|| {
            BuslineError::handler(self.name(), message.message_name(), "integer overflow")
        })?;
        self.reply.reply(&self.message_name, sum).map(Some)
    }

    fn name(&self) -> &str {
        "add_integer"
    }
}

/// Replies with the negated inbound boolean.
#[derive(Debug)]
pub struct InvertBoolean {
    message_name: String,
    reply: ReplySettings,
}

impl InvertBoolean {
    pub fn new(message_name: &str, reply: ReplySettings) -> Self {
        Self {
            message_name: message_name.to_string(),
            reply,
        }
    }
}

impl Handler for InvertBoolean {
    fn message_name(&self) -> &str {
        &self.message_name
    }

    fn execute(&self, message: &CommandMessage) -> Result<Option<CommandMessage>, BuslineError> {
        let value = message
            .payload()
            .as_bool()
            .ok_or_else(|| wrong_form(self.name(), message, "boolean"))?;
        self.reply.reply(&self.message_name, !value).map(Some)
    }

    fn name(&self) -> &str {
        "invert_boolean"
    }
}

/// Replies with the inbound payload unchanged.
#[derive(Debug)]
pub struct Echo {
    message_name: String,
    reply: ReplySettings,
}

impl Echo {
    pub fn new(message_name: &str, reply: ReplySettings) -> Self {
        Self {
            message_name: message_name.to_string(),
            reply,
        }
    }
}

impl Handler for Echo {
    fn message_name(&self) -> &str {
        &self.message_name
    }

    fn execute(&self, message: &CommandMessage) -> Result<Option<CommandMessage>, BuslineError> {
        let payload: Payload = message.payload().clone();
        self.reply.reply(&self.message_name, payload).map(Some)
    }

    fn name(&self) -> &str {
        "echo"
    }
}
