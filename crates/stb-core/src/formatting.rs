//! Text helpers shared by the command layer.

use crate::domain::{Ticket, TicketStatus};

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Display label for a ticket status. The store persists the bare literals;
/// this mapping is purely cosmetic.
pub fn format_status(status: TicketStatus) -> &'static str {
    match status {
        TicketStatus::Open => "Open 🟢",
        TicketStatus::Closed => "Closed 🔴",
    }
}

/// One `/mytickets` line: `#3 [Open 🟢] printer jam`.
pub fn format_ticket_line(t: &Ticket) -> String {
    format!(
        "#{} [{}] {}",
        t.id,
        format_status(t.status),
        escape_html(&t.message)
    )
}

/// One `/alltickets` line, with the requester label: `#3 @alice [Open 🟢] printer jam`.
pub fn format_ticket_line_admin(t: &Ticket) -> String {
    format!(
        "#{} @{} [{}] {}",
        t.id,
        escape_html(&t.username),
        format_status(t.status),
        escape_html(&t.message)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TicketId, UserId};

    fn ticket(status: TicketStatus) -> Ticket {
        Ticket {
            id: TicketId(3),
            user_id: UserId(42),
            username: "alice".to_string(),
            message: "printer jam".to_string(),
            status,
        }
    }

    #[test]
    fn status_labels() {
        assert_eq!(format_status(TicketStatus::Open), "Open 🟢");
        assert_eq!(format_status(TicketStatus::Closed), "Closed 🔴");
    }

    #[test]
    fn escapes_html_metacharacters() {
        assert_eq!(escape_html("a<b&c>\"d\""), "a&lt;b&amp;c&gt;&quot;d&quot;");
    }

    #[test]
    fn renders_ticket_lines() {
        assert_eq!(
            format_ticket_line(&ticket(TicketStatus::Open)),
            "#3 [Open 🟢] printer jam"
        );
        assert_eq!(
            format_ticket_line_admin(&ticket(TicketStatus::Closed)),
            "#3 @alice [Closed 🔴] printer jam"
        );
    }

    #[test]
    fn ticket_line_escapes_subject() {
        let mut t = ticket(TicketStatus::Open);
        t.message = "<script>".to_string();
        assert_eq!(format_ticket_line(&t), "#3 [Open 🟢] &lt;script&gt;");
    }
}
