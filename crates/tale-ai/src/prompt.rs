//! The role-tagged message log sent to a teller.
//!
//! Every position argument accepts Python-style indices: non-negative values
//! count from the start, negative values from the end (`-1` is the last
//! message). Element positions must fall in `[-len, len)`; insertion points
//! and range ends may also equal `len`.

use std::fmt;

use crate::error::{Error, Result};
use crate::types::{Message, Role, RoleNames};

/// An ordered, editable sequence of messages bound to one set of role names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    roles: RoleNames,
    messages: Vec<Message>,
}

impl Prompt {
    /// Create an empty prompt using the given role names
    pub fn new(roles: RoleNames) -> Self {
        Self {
            roles,
            messages: Vec::new(),
        }
    }

    /// Role names this prompt was created with
    pub fn roles(&self) -> &RoleNames {
        &self.roles
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    /// Resolve an element index to a position in `0..len`
    fn resolve(&self, index: isize) -> Result<usize> {
        let len = self.messages.len() as isize;
        let pos = if index < 0 { index + len } else { index };
        if pos < 0 || pos >= len {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.messages.len(),
            });
        }
        Ok(pos as usize)
    }

    /// Resolve an insertion point or range end to a position in `0..=len`
    fn resolve_boundary(&self, index: isize) -> Result<usize> {
        let len = self.messages.len() as isize;
        let pos = if index < 0 { index + len } else { index };
        if pos < 0 || pos > len {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.messages.len(),
            });
        }
        Ok(pos as usize)
    }

    /// Append a message. With `replace`, a trailing message of the same role
    /// is overwritten instead.
    pub fn append(&mut self, role: Role, content: impl Into<String>, replace: bool) {
        if replace {
            if let Some(last) = self.messages.last_mut() {
                if last.role == role {
                    last.content = content.into();
                    return;
                }
            }
        }
        self.messages.push(Message::new(role, content));
    }

    /// Append a system message (see [`Prompt::append`])
    pub fn system(&mut self, content: impl Into<String>, replace: bool) {
        self.append(Role::System, content, replace);
    }

    /// Append a user message (see [`Prompt::append`])
    pub fn user(&mut self, content: impl Into<String>, replace: bool) {
        self.append(Role::User, content, replace);
    }

    /// Append a bot message (see [`Prompt::append`])
    pub fn bot(&mut self, content: impl Into<String>, replace: bool) {
        self.append(Role::Bot, content, replace);
    }

    /// Append an already-built message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn message(&self, index: isize) -> Result<&Message> {
        let pos = self.resolve(index)?;
        Ok(&self.messages[pos])
    }

    /// Content of the message at `index`
    pub fn get(&self, index: isize) -> Result<&str> {
        Ok(&self.message(index)?.content)
    }

    /// Role of the message at `index`
    pub fn role(&self, index: isize) -> Result<Role> {
        Ok(self.message(index)?.role)
    }

    /// Role of the last message, if any
    pub fn last_role(&self) -> Option<Role> {
        self.messages.last().map(|m| m.role)
    }

    /// Insert messages before position `at`, or append when `at` is `None`.
    /// Returns the number of messages inserted.
    pub fn insert<I>(&mut self, messages: I, at: Option<isize>) -> Result<usize>
    where
        I: IntoIterator<Item = Message>,
    {
        let pos = match at {
            Some(index) => self.resolve_boundary(index)?,
            None => self.messages.len(),
        };
        let before = self.messages.len();
        let rest = self.messages.split_off(pos);
        self.messages.extend(messages);
        self.messages.extend(rest);
        Ok(self.messages.len() - before)
    }

    /// Overwrite the content at `index`, keeping its role
    pub fn replace(&mut self, content: impl Into<String>, index: isize) -> Result<()> {
        let pos = self.resolve(index)?;
        self.messages[pos].content = content.into();
        Ok(())
    }

    /// Delete the half-open range `begin..end` (`None` meaning to the end).
    /// Returns the number of messages removed.
    pub fn delete(&mut self, begin: isize, end: Option<isize>) -> Result<usize> {
        let start = self.resolve(begin)?;
        let stop = match end {
            Some(index) => self.resolve_boundary(index)?,
            None => self.messages.len(),
        };
        if stop < start {
            return Err(Error::InvalidRange {
                begin: start,
                end: stop,
            });
        }
        Ok(self.messages.drain(start..stop).count())
    }

    /// Messages from `from` (an insertion-point index) to the end
    pub fn tail(&self, from: isize) -> Result<&[Message]> {
        let pos = self.resolve_boundary(from)?;
        Ok(&self.messages[pos..])
    }

    /// All message contents in order
    pub fn contents(&self) -> Vec<&str> {
        self.contents_where(|_| true)
    }

    /// Contents of the messages matching `predicate`
    pub fn contents_where(&self, predicate: impl Fn(&Message) -> bool) -> Vec<&str> {
        self.messages
            .iter()
            .filter(|m| predicate(m))
            .map(|m| m.content.as_str())
            .collect()
    }

    /// Contents of bot messages only
    pub fn bot_contents(&self) -> Vec<&str> {
        self.contents_where(|m| m.role == Role::Bot)
    }
}

impl<'a> IntoIterator for &'a Prompt {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for message in &self.messages {
            writeln!(f, "{}: {}", self.roles.name(message.role), message.content)?;
        }
        Ok(())
    }
}
