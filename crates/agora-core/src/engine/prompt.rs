//! Prompt assembly for both turn kinds. The system prompt carries the
//! persona profile; the instruction carries the per-turn rhetorical task.

use crate::catalog::Persona;

pub const DIRECTIVE_COUNT: usize = 8;

/// System prompt for a scheduled AI-to-AI turn.
pub fn debate_system(
    cur: &Persona,
    other: &Persona,
    topic: &str,
    humans_present: bool,
    message_no: u32,
) -> String {
    let audience = if humans_present {
        "There are humans watching and participating — acknowledge them occasionally.\n"
    } else {
        ""
    };
    format!(
        "You are {name} — {role}.\n\
         Personality: {personality}.\n\
         Style: {style}.\n\
         Debating \"{topic}\" with {other_name} ({other_role}).\n\
         {audience}\
         Under 80 words. Sharp, direct, conversational.\n\
         Don't start with your name. No quotes. Engage their points.\n\
         Message {message_no} of ongoing conversation — keep it flowing.\n\
         Don't repeat yourself.",
        name = cur.name,
        role = cur.role,
        personality = cur.personality,
        style = cur.style,
        other_name = other.name,
        other_role = other.role,
    )
}

/// System prompt when answering a human interjection.
pub fn reply_system(cur: &Persona, other: &Persona, topic: &str) -> String {
    format!(
        "You are {name} — {role}.\n\
         Personality: {personality}.\n\
         Style: {style}.\n\
         You're in a live group debate about \"{topic}\" with {other_name} ({other_role}) and human participants.\n\
         A human has joined and said something. Respond to them directly — use their name.\n\
         Be warm but stay in character. Under 80 words. Be conversational.",
        name = cur.name,
        role = cur.role,
        personality = cur.personality,
        style = cur.style,
        other_name = other.name,
        other_role = other.role,
    )
}

pub fn opening_instruction(topic: &str) -> String {
    format!("Topic: \"{topic}\"\nYou go first. Opening thought. Under 80 words.")
}

/// One of the fixed rhetorical directives, applied against the opponent's
/// most recent utterance. `pick` is chosen by the caller's session RNG.
pub fn directive_instruction(topic: &str, other_name: &str, last: &str, pick: usize) -> String {
    let directive = match pick % DIRECTIVE_COUNT {
        0 => format!("Respond to {other_name}: \"{last}\"\nPush back on their weakest point."),
        1 => format!("{other_name} said: \"{last}\"\nGive a real-world example that counters this."),
        2 => format!("{other_name} said: \"{last}\"\nAcknowledge something right, then hit harder."),
        3 => format!("{other_name} said: \"{last}\"\nAsk a sharp question they'd struggle with."),
        4 => format!("{other_name} said: \"{last}\"\nExpose the assumption behind their argument."),
        5 => format!("{other_name} said: \"{last}\"\nBring up something nobody has mentioned yet."),
        6 => format!("{other_name} said: \"{last}\"\nWhy does this topic matter to someone like you?"),
        _ => format!("{other_name} said: \"{last}\"\nWhere do you both agree vs truly disagree?"),
    };
    format!("Topic: \"{topic}\"\n{directive}\nUnder 80 words.")
}

/// Optional tail for auto turns that briefly acknowledges a recent human
/// message.
pub fn human_reference_note(user_name: &str, text: &str) -> String {
    format!(
        "\n(Also, a human named {user_name} recently said: \"{text}\" — you may briefly reference this.)"
    )
}

/// Instruction for RESPOND_TO_HUMAN: recent chat lines plus the addressed
/// human's name.
pub fn human_reply_instruction(topic: &str, context: &str, user_name: &str) -> String {
    format!(
        "Topic: \"{topic}\"\nRecent chat:\n{context}\n\nRespond to {user_name}'s message. Under 80 words."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persona(name: &str, role: &str) -> Persona {
        Persona {
            id: name.to_lowercase(),
            name: name.to_string(),
            avatar: "⭐".to_string(),
            color: "#fff".to_string(),
            role: role.to_string(),
            personality: "curious".to_string(),
            style: "direct".to_string(),
        }
    }

    #[test]
    fn debate_system_mentions_both_personas_and_audience() {
        let nova = persona("Nova", "The Optimist");
        let axiom = persona("Axiom", "The Skeptic");
        let with_humans = debate_system(&nova, &axiom, "cash", true, 3);
        assert!(with_humans.contains("You are Nova"));
        assert!(with_humans.contains("Axiom (The Skeptic)"));
        assert!(with_humans.contains("humans watching"));
        assert!(with_humans.contains("Message 3"));

        let without = debate_system(&nova, &axiom, "cash", false, 1);
        assert!(!without.contains("humans watching"));
    }

    #[test]
    fn every_directive_embeds_the_opponents_last_words() {
        for pick in 0..DIRECTIVE_COUNT {
            let inst = directive_instruction("zoos", "Axiom", "cages are wrong", pick);
            assert!(inst.contains("cages are wrong"), "directive {pick}");
            assert!(inst.starts_with("Topic: \"zoos\""));
        }
    }

    #[test]
    fn human_reply_instruction_names_the_addressee() {
        let inst = human_reply_instruction("cash", "Ana: hello", "Ana");
        assert!(inst.contains("Respond to Ana's message"));
        assert!(inst.contains("Ana: hello"));
    }
}
