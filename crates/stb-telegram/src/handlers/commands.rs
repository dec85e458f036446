use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::ParseMode;

use stb_core::{
    domain::{MessageSender, TicketId, UserId},
    errors::Error,
    formatting::{escape_html, format_ticket_line, format_ticket_line_admin},
    notify::broadcast,
};

use crate::router::AppState;

const NO_ACCESS: &str = "❌ No access.";

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

/// Numeric ticket id from `/close 7` style arguments.
fn parse_ticket_id(arg: &str) -> Option<TicketId> {
    arg.parse::<i64>().ok().filter(|id| *id > 0).map(TicketId)
}

fn parse_user_id(arg: &str) -> Option<UserId> {
    arg.parse::<i64>().ok().map(UserId)
}

/// `/reply <id> <text>`: split the id off the front of the argument string.
fn split_reply_args(arg: &str) -> Option<(TicketId, &str)> {
    let mut parts = arg.splitn(2, char::is_whitespace);
    let id = parse_ticket_id(parts.next()?.trim())?;
    let text = parts.next().unwrap_or("").trim();
    if text.is_empty() {
        return None;
    }
    Some((id, text))
}

fn help_text(is_admin: bool) -> String {
    if is_admin {
        "👋 <b>Hello, administrator!</b>\n\n\
<b>Ticket management:</b>\n\
📄 /alltickets — show all tickets\n\
💬 /reply &lt;id&gt; &lt;text&gt; — reply to a ticket\n\
✅ /close &lt;id&gt; — close a ticket\n\
🚫 /ban &lt;user_id&gt; — ban a user\n\
♻️ /unban &lt;user_id&gt; — unban a user\n\
📜 /banlist — show banned users\n\n\
<b>User commands:</b>\n\
🆕 /new &lt;text&gt; — open a new ticket\n\
📋 /mytickets — show your tickets\n\
ℹ️ /start — show this help"
            .to_string()
    } else {
        "👋 <b>Hi! I am the support bot.</b>\n\n\
📝 <b>User commands:</b>\n\
🆕 /new &lt;text&gt; — open a new ticket\n\
📋 /mytickets — show your tickets\n\
ℹ️ /start — show this help"
            .to_string()
    }
}

async fn send_html(bot: &Bot, chat_id: teloxide::types::ChatId, text: &str) {
    let _ = bot
        .send_message(chat_id, text.to_string())
        .parse_mode(ParseMode::Html)
        .await;
}

pub async fn handle_command(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let user_id = UserId(user.id.0 as i64);
    let username = user
        .username
        .clone()
        .unwrap_or_else(|| "unknown".to_string());
    let chat_id = msg.chat.id;

    let (cmd, arg) = parse_command(text);

    match cmd.as_str() {
        "start" | "help" => {
            send_html(&bot, chat_id, &help_text(state.auth.is_admin(user_id))).await;
        }

        "new" => {
            if arg.is_empty() {
                send_html(
                    &bot,
                    chat_id,
                    "⚠️ Describe the problem: /new &lt;text&gt;",
                )
                .await;
                return Ok(());
            }

            match state.tickets.create_ticket(user_id, &username, &arg).await {
                Ok(ticket) => {
                    tracing::info!(ticket = ticket.id.0, user = user_id.0, "ticket created");
                    send_html(&bot, chat_id, &format!("✅ Ticket #{} created!", ticket.id)).await;

                    let notice = format!(
                        "🆕 New ticket #{} from @{}:\n{}",
                        ticket.id,
                        escape_html(&ticket.username),
                        escape_html(&ticket.message)
                    );
                    let report = broadcast(
                        state.notifier.clone(),
                        &state.auth.admins(),
                        &notice,
                        state.cfg.notify_timeout,
                    )
                    .await;
                    for (admin, err) in &report.failed {
                        tracing::warn!(admin = admin.0, error = %err, "new-ticket notice not delivered");
                    }
                }
                Err(Error::Banned(_)) => {
                    send_html(&bot, chat_id, "🚫 You are banned and cannot open new tickets.")
                        .await;
                }
                Err(e) => {
                    send_html(&bot, chat_id, &format!("❌ {}", escape_html(&e.to_string())))
                        .await;
                }
            }
        }

        "mytickets" => match state.tickets.list_by_requester(user_id).await {
            Ok(list) if list.is_empty() => {
                send_html(&bot, chat_id, "📭 You have no tickets.").await;
            }
            Ok(list) => {
                let lines: Vec<String> = list.iter().map(format_ticket_line).collect();
                send_html(
                    &bot,
                    chat_id,
                    &format!("📋 <b>Your tickets:</b>\n{}", lines.join("\n")),
                )
                .await;
            }
            Err(e) => {
                send_html(&bot, chat_id, &format!("❌ {}", escape_html(&e.to_string()))).await;
            }
        },

        "alltickets" => {
            if state.auth.ensure_admin(user_id).is_err() {
                send_html(&bot, chat_id, NO_ACCESS).await;
                return Ok(());
            }

            match state.tickets.list_all().await {
                Ok(list) if list.is_empty() => {
                    send_html(&bot, chat_id, "📭 No tickets.").await;
                }
                Ok(list) => {
                    let lines: Vec<String> = list.iter().map(format_ticket_line_admin).collect();
                    send_html(
                        &bot,
                        chat_id,
                        &format!("📋 <b>All tickets:</b>\n{}", lines.join("\n")),
                    )
                    .await;
                }
                Err(e) => {
                    send_html(&bot, chat_id, &format!("❌ {}", escape_html(&e.to_string())))
                        .await;
                }
            }
        }

        "close" => {
            if state.auth.ensure_admin(user_id).is_err() {
                send_html(&bot, chat_id, NO_ACCESS).await;
                return Ok(());
            }

            let Some(id) = parse_ticket_id(&arg) else {
                send_html(&bot, chat_id, "⚠️ Usage: /close &lt;id&gt;").await;
                return Ok(());
            };

            match state.tickets.close_ticket(id).await {
                Ok(ticket) => {
                    tracing::info!(ticket = ticket.id.0, admin = user_id.0, "ticket closed");
                    send_html(&bot, chat_id, &format!("🔴 Ticket #{} closed.", ticket.id)).await;
                }
                Err(Error::NotFound(_)) => {
                    send_html(&bot, chat_id, &format!("❌ Ticket #{id} not found.")).await;
                }
                Err(e) => {
                    send_html(&bot, chat_id, &format!("❌ {}", escape_html(&e.to_string())))
                        .await;
                }
            }
        }

        "reply" => {
            if state.auth.ensure_admin(user_id).is_err() {
                send_html(&bot, chat_id, NO_ACCESS).await;
                return Ok(());
            }

            let Some((id, body)) = split_reply_args(&arg) else {
                send_html(&bot, chat_id, "⚠️ Usage: /reply &lt;id&gt; &lt;text&gt;").await;
                return Ok(());
            };

            let owner = match state.tickets.owner_of(id).await {
                Ok(owner) => owner,
                Err(Error::NotFound(_)) => {
                    send_html(&bot, chat_id, &format!("❌ Ticket #{id} not found.")).await;
                    return Ok(());
                }
                Err(e) => {
                    send_html(&bot, chat_id, &format!("❌ {}", escape_html(&e.to_string())))
                        .await;
                    return Ok(());
                }
            };

            if let Err(e) = state.messages.append(id, MessageSender::Admin, body).await {
                send_html(&bot, chat_id, &format!("❌ {}", escape_html(&e.to_string()))).await;
                return Ok(());
            }
            tracing::info!(ticket = id.0, admin = user_id.0, "reply recorded");

            // The reply is persisted regardless of what delivery does next.
            let note = format!(
                "💬 <b>Support reply on ticket #{}:</b>\n{}",
                id,
                escape_html(body)
            );
            let delivery =
                tokio::time::timeout(state.cfg.notify_timeout, state.notifier.notify(owner, &note))
                    .await;
            match delivery {
                Ok(Ok(())) => {
                    send_html(&bot, chat_id, &format!("✅ Reply on ticket #{id} sent.")).await;
                }
                Ok(Err(e)) => {
                    tracing::warn!(ticket = id.0, user = owner.0, error = %e, "reply not delivered");
                    send_html(
                        &bot,
                        chat_id,
                        "⚠️ Reply saved, but delivery to the requester failed.",
                    )
                    .await;
                }
                Err(_) => {
                    tracing::warn!(ticket = id.0, user = owner.0, "reply delivery timed out");
                    send_html(
                        &bot,
                        chat_id,
                        "⚠️ Reply saved, but delivery to the requester timed out.",
                    )
                    .await;
                }
            }
        }

        "ban" => {
            if state.auth.ensure_admin(user_id).is_err() {
                send_html(&bot, chat_id, NO_ACCESS).await;
                return Ok(());
            }

            let Some(target) = parse_user_id(&arg) else {
                send_html(&bot, chat_id, "⚠️ Usage: /ban &lt;user_id&gt;").await;
                return Ok(());
            };

            match state.bans.ban(target).await {
                Ok(()) => {
                    tracing::info!(user = target.0, admin = user_id.0, "user banned");
                    send_html(&bot, chat_id, &format!("🚫 User {target} banned.")).await;
                }
                Err(e) => {
                    send_html(&bot, chat_id, &format!("❌ {}", escape_html(&e.to_string())))
                        .await;
                }
            }
        }

        "unban" => {
            if state.auth.ensure_admin(user_id).is_err() {
                send_html(&bot, chat_id, NO_ACCESS).await;
                return Ok(());
            }

            let Some(target) = parse_user_id(&arg) else {
                send_html(&bot, chat_id, "⚠️ Usage: /unban &lt;user_id&gt;").await;
                return Ok(());
            };

            match state.bans.unban(target).await {
                Ok(()) => {
                    tracing::info!(user = target.0, admin = user_id.0, "user unbanned");
                    send_html(&bot, chat_id, &format!("♻️ User {target} unbanned.")).await;
                }
                Err(e) => {
                    send_html(&bot, chat_id, &format!("❌ {}", escape_html(&e.to_string())))
                        .await;
                }
            }
        }

        "banlist" => {
            if state.auth.ensure_admin(user_id).is_err() {
                send_html(&bot, chat_id, NO_ACCESS).await;
                return Ok(());
            }

            match state.bans.list_banned().await {
                Ok(list) if list.is_empty() => {
                    send_html(&bot, chat_id, "📜 Ban list is empty.").await;
                }
                Ok(list) => {
                    let lines: Vec<String> = list.iter().map(|u| format!("• {u}")).collect();
                    send_html(
                        &bot,
                        chat_id,
                        &format!("📜 <b>Banned users:</b>\n{}", lines.join("\n")),
                    )
                    .await;
                }
                Err(e) => {
                    send_html(&bot, chat_id, &format!("❌ {}", escape_html(&e.to_string())))
                        .await;
                }
            }
        }

        _ => {
            send_html(
                &bot,
                chat_id,
                &format!("Unknown command: /{}. Use /start for help.", escape_html(&cmd)),
            )
            .await;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_command_with_bot_suffix_and_args() {
        assert_eq!(
            parse_command("/close@SupportBot 5"),
            ("close".to_string(), "5".to_string())
        );
        assert_eq!(
            parse_command("/new   printer jam"),
            ("new".to_string(), "printer jam".to_string())
        );
        assert_eq!(parse_command("/BANLIST"), ("banlist".to_string(), String::new()));
        assert_eq!(parse_command("/mytickets"), ("mytickets".to_string(), String::new()));
    }

    #[test]
    fn ticket_ids_must_be_positive_integers() {
        assert_eq!(parse_ticket_id("7"), Some(TicketId(7)));
        assert_eq!(parse_ticket_id("0"), None);
        assert_eq!(parse_ticket_id("-3"), None);
        assert_eq!(parse_ticket_id("abc"), None);
        assert_eq!(parse_ticket_id(""), None);
    }

    #[test]
    fn reply_args_need_an_id_and_a_body() {
        assert_eq!(
            split_reply_args("7 on the way"),
            Some((TicketId(7), "on the way"))
        );
        assert_eq!(split_reply_args("7"), None);
        assert_eq!(split_reply_args("7   "), None);
        assert_eq!(split_reply_args("x hello"), None);
        assert_eq!(split_reply_args(""), None);
    }

    #[test]
    fn help_mentions_moderation_commands_only_for_admins() {
        let admin = help_text(true);
        let user = help_text(false);

        assert!(admin.contains("/alltickets"));
        assert!(admin.contains("/banlist"));
        assert!(!user.contains("/alltickets"));
        assert!(!user.contains("/ban"));
        assert!(user.contains("/new"));
        assert!(user.contains("/mytickets"));
    }
}
