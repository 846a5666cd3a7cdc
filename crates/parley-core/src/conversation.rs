//! Conversation shaping: provider-agnostic messages in, strictly alternating turns out.
//!
//! Several providers only know two turn roles and reject two consecutive turns with the
//! same role. `normalize_conversation` maps roles, folds `system` content into the turn
//! being built, and merges same-role neighbours so nothing is dropped.

use serde::{Deserialize, Serialize};

/// Prefix applied to `system` content folded into a regular turn.
pub const SYSTEM_TAG: &str = "[system]";

/// Role of an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// One message of the conversation history, in caller order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// Provider-facing turn role. Adapters map `Model` to whatever the provider calls it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

/// Reshape `messages` into turns whose roles strictly alternate.
///
/// A leading `system` message opens the first `user` turn.
pub fn normalize_conversation(messages: &[Message]) -> Vec<Turn> {
    let mut turns: Vec<Turn> = Vec::with_capacity(messages.len());

    for msg in messages {
        let (role, text) = match msg.role {
            Role::User => (TurnRole::User, msg.content.clone()),
            Role::Assistant => (TurnRole::Model, msg.content.clone()),
            Role::System => {
                let role = turns.last().map(|t| t.role).unwrap_or(TurnRole::User);
                (role, format!("{} {}", SYSTEM_TAG, msg.content))
            }
        };

        match turns.last_mut() {
            Some(last) if last.role == role => {
                last.text.push('\n');
                last.text.push_str(&text);
            }
            _ => turns.push(Turn { role, text }),
        }
    }

    turns
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alternates(turns: &[Turn]) -> bool {
        turns.windows(2).all(|w| w[0].role != w[1].role)
    }

    #[test]
    fn maps_assistant_to_model() {
        let turns = normalize_conversation(&[Message::user("hi"), Message::assistant("hello")]);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, TurnRole::User);
        assert_eq!(turns[1].role, TurnRole::Model);
        assert_eq!(turns[1].text, "hello");
    }

    #[test]
    fn merges_consecutive_same_role() {
        let turns = normalize_conversation(&[
            Message::user("one"),
            Message::user("two"),
            Message::assistant("three"),
            Message::assistant("four"),
            Message::user("five"),
        ]);
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].text, "one\ntwo");
        assert_eq!(turns[1].text, "three\nfour");
        assert_eq!(turns[2].text, "five");
        assert!(alternates(&turns));
    }

    #[test]
    fn leading_system_becomes_user_turn() {
        let turns = normalize_conversation(&[Message::system("be brief"), Message::user("hi")]);
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, TurnRole::User);
        assert_eq!(turns[0].text, "[system] be brief\nhi");
    }

    #[test]
    fn system_folds_into_current_model_turn() {
        let turns = normalize_conversation(&[
            Message::user("hi"),
            Message::assistant("hello"),
            Message::system("switch to french"),
            Message::user("bonjour"),
        ]);
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[1].role, TurnRole::Model);
        assert_eq!(turns[1].text, "hello\n[system] switch to french");
        assert!(alternates(&turns));
    }

    #[test]
    fn never_two_consecutive_roles() {
        let roles = [Role::User, Role::Assistant, Role::System];
        // Every sequence of length 1..=5 over the three roles.
        for len in 1..=5u32 {
            for code in 0..3u32.pow(len) {
                let mut c = code;
                let messages: Vec<Message> = (0..len)
                    .map(|i| {
                        let role = roles[(c % 3) as usize];
                        c /= 3;
                        Message::new(role, format!("m{}", i))
                    })
                    .collect();
                let turns = normalize_conversation(&messages);
                assert!(!turns.is_empty());
                assert!(alternates(&turns), "{:?}", messages);
                let joined: String = turns.iter().map(|t| t.text.as_str()).collect::<Vec<_>>().join("\n");
                for i in 0..len {
                    assert!(joined.contains(&format!("m{}", i)));
                }
            }
        }
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("Assistant".parse::<Role>(), Ok(Role::Assistant));
        assert!("bot".parse::<Role>().is_err());
    }
}
