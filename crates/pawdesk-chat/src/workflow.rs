//! The appointment-booking state machine.
//!
//! A pure transition function over an enumerated step type: given the current
//! step, the user's message, and the data collected so far, it returns the
//! reply to emit, the next step, a data patch, and a terminal signal. It never
//! mutates its inputs and never touches storage, which keeps every transition
//! unit-testable in isolation.
//!
//! Steps run in strict linear order:
//! `None -> OwnerName -> PetName -> Phone -> DateTime -> Confirm`, ending in
//! either a confirmation or a cancellation. A failed validation re-emits the
//! same step with a corrective prompt; previously collected data is never
//! lost.

use std::sync::LazyLock;

use regex::Regex;

use pawdesk_core::types::{BookingData, BookingStep, ConversationContext};

/// Terminal signal of a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The workflow continues at `next_step`.
    Continue,
    /// All data collected and confirmed; the orchestrator creates the
    /// appointment and resets the workflow.
    Confirmed,
    /// The user cancelled; all collected data is discarded.
    Cancelled,
}

/// Result of advancing the workflow by one message.
#[derive(Clone, Debug)]
pub struct Transition {
    /// Reply to show the user.
    pub reply: String,
    /// Step to persist for the next turn; `None` on terminal outcomes.
    pub next_step: Option<BookingStep>,
    /// Fields collected from this message, to merge into the booking data.
    pub patch: BookingData,
    pub outcome: Outcome,
}

impl Transition {
    fn advance_to(reply: String, next_step: BookingStep, patch: BookingData) -> Self {
        Self {
            reply,
            next_step: Some(next_step),
            patch,
            outcome: Outcome::Continue,
        }
    }

    fn reprompt(reply: &str, step: BookingStep) -> Self {
        Self {
            reply: reply.to_string(),
            next_step: Some(step),
            patch: BookingData::default(),
            outcome: Outcome::Continue,
        }
    }

    fn terminal(reply: String, outcome: Outcome) -> Self {
        Self {
            reply,
            next_step: None,
            patch: BookingData::default(),
            outcome,
        }
    }
}

// Phone shape: optional leading +, then 7-15 characters of digits, spaces,
// dashes, and parentheses, anchored over the whole (trimmed) input.
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[\d\s()\-]{7,15}$").expect("Invalid phone regex"));

/// Validate a phone number's shape.
pub fn validate_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone.trim())
}

/// Validate a date/time expression.
///
/// Deliberately permissive: free-form expressions like "Tomorrow afternoon"
/// must pass, so only non-triviality is checked.
pub fn validate_date_time(date_time: &str) -> bool {
    date_time.trim().chars().count() >= 5
}

fn valid_name(name: &str) -> bool {
    name.trim().chars().count() >= 2
}

/// Advance the booking workflow by one user message.
///
/// `step` is `None` when the workflow was just started this turn; the opening
/// prompt is emitted unconditionally in that case.
pub fn advance(
    step: Option<BookingStep>,
    message: &str,
    data: &BookingData,
    context: &ConversationContext,
) -> Transition {
    let input = message.trim();

    let Some(step) = step else {
        let greeting = match &context.user_name {
            Some(name) => format!("I'd be happy to help you book an appointment, {}! 🐾", name),
            None => "I'd be happy to help you book an appointment! 🐾".to_string(),
        };
        return Transition::advance_to(
            format!(
                "{}\n\nLet's get that scheduled. Could you please provide your **full name**?",
                greeting
            ),
            BookingStep::OwnerName,
            BookingData::default(),
        );
    };

    match step {
        BookingStep::OwnerName => {
            if !valid_name(input) {
                return Transition::reprompt(
                    "Please enter your full name to continue.",
                    BookingStep::OwnerName,
                );
            }
            Transition::advance_to(
                format!(
                    "Great, {}! 😊\n\nWhat is your **pet's name** and **species** (e.g., \"Max, golden retriever\")?",
                    input
                ),
                BookingStep::PetName,
                BookingData {
                    owner_name: Some(input.to_string()),
                    ..BookingData::default()
                },
            )
        }

        BookingStep::PetName => {
            if !valid_name(input) {
                return Transition::reprompt(
                    "Please tell me your pet's name and type.",
                    BookingStep::PetName,
                );
            }
            Transition::advance_to(
                format!(
                    "{} sounds adorable! 🐶🐱\n\nWhat is your **phone number** so we can confirm the appointment?",
                    input
                ),
                BookingStep::Phone,
                BookingData {
                    pet_name: Some(input.to_string()),
                    ..BookingData::default()
                },
            )
        }

        BookingStep::Phone => {
            if !validate_phone(input) {
                return Transition::reprompt(
                    "That doesn't look like a valid phone number. Please enter a valid phone number (e.g., +1 555-123-4567).",
                    BookingStep::Phone,
                );
            }
            Transition::advance_to(
                "Perfect! 📞\n\nWhen would you like the appointment? Please provide your **preferred date and time** (e.g., \"June 20th at 2 PM\" or \"Tomorrow afternoon\").".to_string(),
                BookingStep::DateTime,
                BookingData {
                    phone: Some(input.to_string()),
                    ..BookingData::default()
                },
            )
        }

        BookingStep::DateTime => {
            if !validate_date_time(input) {
                return Transition::reprompt(
                    "Please provide a valid date and time for your appointment.",
                    BookingStep::DateTime,
                );
            }
            Transition::advance_to(
                format!(
                    "Almost done! Please **confirm** the following details:\n\n\
                     👤 **Owner:** {}\n🐾 **Pet:** {}\n📞 **Phone:** {}\n📅 **Date/Time:** {}\n\n\
                     Type **\"confirm\"** to book this appointment or **\"cancel\"** to start over.",
                    data.owner_name.as_deref().unwrap_or(""),
                    data.pet_name.as_deref().unwrap_or(""),
                    data.phone.as_deref().unwrap_or(""),
                    input
                ),
                BookingStep::Confirm,
                BookingData {
                    date_time: Some(input.to_string()),
                    ..BookingData::default()
                },
            )
        }

        BookingStep::Confirm => {
            let lower = input.to_lowercase();
            // "confirm" wins when a message contains both words.
            if lower.contains("confirm") {
                let pet = data.pet_name.as_deref().unwrap_or("your pet");
                Transition::terminal(
                    format!(
                        "✅ **Appointment Confirmed!**\n\nYour appointment has been successfully booked:\n\n\
                         👤 **Owner:** {}\n🐾 **Pet:** {}\n📞 **Phone:** {}\n📅 **Date/Time:** {}\n\n\
                         We'll see you and {} soon! Is there anything else you'd like to know? 🐾",
                        data.owner_name.as_deref().unwrap_or(""),
                        data.pet_name.as_deref().unwrap_or(""),
                        data.phone.as_deref().unwrap_or(""),
                        data.date_time.as_deref().unwrap_or(""),
                        pet
                    ),
                    Outcome::Confirmed,
                )
            } else if lower.contains("cancel") {
                Transition::terminal(
                    "No problem! Your booking has been cancelled. Is there anything else I can help you with?".to_string(),
                    Outcome::Cancelled,
                )
            } else {
                Transition::reprompt(
                    "Please type **\"confirm\"** to complete your booking or **\"cancel\"** to start over.",
                    BookingStep::Confirm,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ConversationContext {
        ConversationContext::default()
    }

    fn filled_data() -> BookingData {
        BookingData {
            owner_name: Some("Jane Doe".into()),
            pet_name: Some("Max, labrador".into()),
            phone: Some("+15551234567".into()),
            date_time: Some("June 20th at 2pm".into()),
        }
    }

    // ---- Opening ----

    #[test]
    fn test_start_emits_opening_prompt() {
        let t = advance(None, "I want to book an appointment", &BookingData::default(), &ctx());
        assert_eq!(t.outcome, Outcome::Continue);
        assert_eq!(t.next_step, Some(BookingStep::OwnerName));
        assert!(t.reply.contains("full name"));
        assert_eq!(t.patch, BookingData::default());
    }

    #[test]
    fn test_start_never_rejects() {
        let t = advance(None, "", &BookingData::default(), &ctx());
        assert_eq!(t.next_step, Some(BookingStep::OwnerName));
    }

    #[test]
    fn test_start_greets_known_user_by_name() {
        let context = ConversationContext {
            user_name: Some("Jane".into()),
            ..ConversationContext::default()
        };
        let t = advance(None, "book please", &BookingData::default(), &context);
        assert!(t.reply.contains("Jane"));
    }

    // ---- Owner name ----

    #[test]
    fn test_owner_name_too_short_reprompts() {
        let t = advance(Some(BookingStep::OwnerName), "J", &BookingData::default(), &ctx());
        assert_eq!(t.outcome, Outcome::Continue);
        assert_eq!(t.next_step, Some(BookingStep::OwnerName));
        assert!(t.patch.owner_name.is_none());
    }

    #[test]
    fn test_owner_name_whitespace_only_reprompts() {
        let t = advance(Some(BookingStep::OwnerName), "   ", &BookingData::default(), &ctx());
        assert_eq!(t.next_step, Some(BookingStep::OwnerName));
    }

    #[test]
    fn test_owner_name_stored_trimmed() {
        let t = advance(Some(BookingStep::OwnerName), "  Jane Doe  ", &BookingData::default(), &ctx());
        assert_eq!(t.next_step, Some(BookingStep::PetName));
        assert_eq!(t.patch.owner_name.as_deref(), Some("Jane Doe"));
        assert!(t.reply.contains("pet's name"));
    }

    // ---- Pet name ----

    #[test]
    fn test_pet_name_too_short_reprompts() {
        let t = advance(Some(BookingStep::PetName), "x", &BookingData::default(), &ctx());
        assert_eq!(t.next_step, Some(BookingStep::PetName));
        assert!(t.patch.pet_name.is_none());
    }

    #[test]
    fn test_pet_name_advances_to_phone() {
        let t = advance(Some(BookingStep::PetName), "Max, labrador", &BookingData::default(), &ctx());
        assert_eq!(t.next_step, Some(BookingStep::Phone));
        assert_eq!(t.patch.pet_name.as_deref(), Some("Max, labrador"));
        assert!(t.reply.contains("phone number"));
    }

    // ---- Phone validation ----

    #[test]
    fn test_phone_five_digits_rejected() {
        assert!(!validate_phone("12345"));
        let t = advance(Some(BookingStep::Phone), "12345", &BookingData::default(), &ctx());
        assert_eq!(t.next_step, Some(BookingStep::Phone));
        assert!(t.patch.phone.is_none());
        assert!(t.reply.contains("valid phone number"));
    }

    #[test]
    fn test_phone_seven_digits_accepted() {
        assert!(validate_phone("1234567"));
    }

    #[test]
    fn test_phone_international_format_accepted() {
        assert!(validate_phone("+1 555-123-4567"));
        let t = advance(Some(BookingStep::Phone), "+1 555-123-4567", &BookingData::default(), &ctx());
        assert_eq!(t.next_step, Some(BookingStep::DateTime));
        assert_eq!(t.patch.phone.as_deref(), Some("+1 555-123-4567"));
    }

    #[test]
    fn test_phone_with_parentheses_accepted() {
        assert!(validate_phone("(555) 123-4567"));
    }

    #[test]
    fn test_phone_with_letters_rejected() {
        assert!(!validate_phone("call me maybe"));
        assert!(!validate_phone("555-CALL-VET"));
    }

    #[test]
    fn test_phone_too_long_rejected() {
        assert!(!validate_phone("1234567890123456"));
    }

    #[test]
    fn test_phone_trimmed_before_validation() {
        assert!(validate_phone("  1234567  "));
    }

    // ---- DateTime validation ----

    #[test]
    fn test_date_time_four_chars_rejected() {
        assert!(!validate_date_time("abcd"));
        let t = advance(Some(BookingStep::DateTime), "abcd", &filled_data(), &ctx());
        assert_eq!(t.next_step, Some(BookingStep::DateTime));
        assert!(t.patch.date_time.is_none());
    }

    #[test]
    fn test_date_time_six_chars_accepted() {
        assert!(validate_date_time("June 2"));
    }

    #[test]
    fn test_date_time_advances_and_echoes_summary() {
        let data = BookingData {
            owner_name: Some("Jane Doe".into()),
            pet_name: Some("Max, labrador".into()),
            phone: Some("+15551234567".into()),
            date_time: None,
        };
        let t = advance(Some(BookingStep::DateTime), "June 20th at 2pm", &data, &ctx());
        assert_eq!(t.next_step, Some(BookingStep::Confirm));
        assert_eq!(t.patch.date_time.as_deref(), Some("June 20th at 2pm"));
        for field in ["Jane Doe", "Max, labrador", "+15551234567", "June 20th at 2pm"] {
            assert!(t.reply.contains(field), "summary missing {}", field);
        }
    }

    // ---- Confirm step ----

    #[test]
    fn test_confirm_completes_workflow() {
        let t = advance(Some(BookingStep::Confirm), "confirm", &filled_data(), &ctx());
        assert_eq!(t.outcome, Outcome::Confirmed);
        assert_eq!(t.next_step, None);
        assert!(t.reply.contains("Appointment Confirmed"));
    }

    #[test]
    fn test_confirm_is_case_insensitive_substring() {
        let t = advance(Some(BookingStep::Confirm), "Yes, CONFIRM it please", &filled_data(), &ctx());
        assert_eq!(t.outcome, Outcome::Confirmed);
    }

    #[test]
    fn test_cancel_discards_workflow() {
        let t = advance(Some(BookingStep::Confirm), "cancel", &filled_data(), &ctx());
        assert_eq!(t.outcome, Outcome::Cancelled);
        assert_eq!(t.next_step, None);
        assert!(t.reply.contains("cancelled"));
    }

    #[test]
    fn test_confirm_wins_over_cancel() {
        let t = advance(Some(BookingStep::Confirm), "confirm, don't cancel", &filled_data(), &ctx());
        assert_eq!(t.outcome, Outcome::Confirmed);
    }

    #[test]
    fn test_confirm_other_input_reprompts() {
        let t = advance(Some(BookingStep::Confirm), "hmm let me think", &filled_data(), &ctx());
        assert_eq!(t.outcome, Outcome::Continue);
        assert_eq!(t.next_step, Some(BookingStep::Confirm));
    }

    // ---- No data loss ----

    #[test]
    fn test_reprompt_patch_is_empty() {
        // A failed validation must not clobber previously collected fields;
        // the patch carries nothing so the merge is a no-op.
        let t = advance(Some(BookingStep::Phone), "nope", &filled_data(), &ctx());
        assert_eq!(t.patch, BookingData::default());
    }
}
