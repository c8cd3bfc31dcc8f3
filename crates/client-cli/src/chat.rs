//! Interactive coaching chat over stdin

use anyhow::Result;
use shared::{
    catalog::DEFAULT_FEATURED_LIMIT, Catalog, ChatMessage, CoachSession, FollowUp, Phase, Sender,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    task::JoinHandle,
};

use crate::{
    api::{ApiClient, ProductFilter},
    views,
};

const PROMPT: &str = "شما> ";
const THINKING: &str = "در حال فکر کردن...";
const FOLLOW_UP_LABEL: &str = "ادامه گفتگو با کوچ در تلگرام";
const SUGGESTIONS_TITLE: &str = "پیشنهادهای مرتبط:";

fn print_message(message: &ChatMessage) {
    match message.sender {
        Sender::Ai => println!("\x1b[36mمشاور>\x1b[0m {}", message.text),
        Sender::User => println!("{}{}", PROMPT, message.text),
    }
}

/// Store the latest exchange without holding up the conversation
fn spawn_log(api: &ApiClient, session: &mut CoachSession) -> Option<JoinHandle<()>> {
    let entry = session.take_log_entry()?;
    let api = api.clone();
    Some(tokio::spawn(async move {
        if let Err(e) = api.log_chat(&entry).await {
            tracing::warn!("Failed to log chat message: {:#}", e);
        }
    }))
}

/// Closing block once the conversation has a verdict
async fn print_closing(api: &ApiClient, session: &CoachSession, follow_up_url: &str) {
    if let Some(FollowUp::Messaging) = session.follow_up() {
        println!();
        println!("\x1b[1;32m{}:\x1b[0m {}", FOLLOW_UP_LABEL, follow_up_url);
    }

    let products = match api.products(&ProductFilter::default()).await {
        Ok(products) => products,
        Err(e) => {
            tracing::debug!("Skipping suggestions: {:#}", e);
            return;
        }
    };
    let catalog = Catalog::new(products);
    let picks = catalog.recommend(session.outcome(), None, DEFAULT_FEATURED_LIMIT);
    if !picks.is_empty() {
        println!();
        println!("{}", SUGGESTIONS_TITLE);
        println!("{}", views::products(&picks, true));
    }
}

pub async fn run(api: &ApiClient, user_id: &str, follow_up_url: &str) -> Result<()> {
    let mut session = CoachSession::new(user_id);
    tracing::info!("Chat session {} started", session.session_id());
    for message in session.transcript() {
        print_message(message);
    }

    let mut pending_logs = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{}", PROMPT);
        std::io::Write::flush(&mut std::io::stdout())?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let request = match session.begin_send(&line) {
            Ok(request) => request,
            Err(rejected) => {
                tracing::debug!("Input ignored: {}", rejected);
                continue;
            }
        };

        eprintln!("\x1b[90m{}\x1b[0m", THINKING);
        let reply = match api.chat(&request).await {
            Ok(body) => session.complete(&body),
            Err(e) => {
                tracing::warn!("Chat request failed: {:#}", e);
                session.fail()
            }
        };
        print_message(reply);
        pending_logs.extend(spawn_log(api, &mut session));

        if session.phase() == Phase::Ended {
            print_closing(api, &session, follow_up_url).await;
            break;
        }
    }

    // Log writes still in flight would be dropped with the runtime
    for handle in pending_logs {
        handle.await.ok();
    }

    let sent = session
        .transcript()
        .iter()
        .filter(|m| m.sender == Sender::User)
        .count();
    tracing::info!("Chat session {} closed", session.session_id());
    println!("\x1b[90m{}\x1b[0m", views::count(sent, "پیام ارسال شد"));
    Ok(())
}
