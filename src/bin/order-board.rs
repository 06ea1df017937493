use anyhow::{Context, Result};
use clap::{Arg, Command};
use log::info;

use shop_orders::format::{format_brl, format_millis};
use shop_orders::prelude::*;

fn render(board: &OrderBoard, options: &ClientOptions) {
    let offset = options.offset();
    let partition = board
        .partition()
        .map(|p| p.to_string())
        .unwrap_or_default();

    println!("Ordens de serviço {} ({})", partition, board.filter().status());
    println!("{:<10} {:<24} {:<11} {:<11} {:>14}", "Placa", "Cliente", "Status", "Abertura", "Total");
    for order in board.visible_orders() {
        let opened = order
            .opened_at
            .and_then(|millis| format_millis(millis, &offset))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<10} {:<24} {:<11} {:<11} {:>14}",
            order.plate,
            order.customer_name,
            order.status,
            opened,
            format_brl(order.totals().grand)
        );
    }

    let totals = board.formatted_totals();
    println!();
    println!("Faturamento diário:  {}", totals.daily);
    println!("Faturamento semanal: {}", totals.weekly);
    println!("Faturamento mensal:  {}", totals.monthly);
}

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();

    let matches = Command::new("order-board")
        .version(env!("CARGO_PKG_VERSION"))
        .about("List a day's service orders and revenue totals")
        .arg(
            Arg::new("database_url")
                .long("database-url")
                .value_name("URL")
                .help("Realtime database URL")
                .takes_value(true)
                .required(true),
        )
        .arg(
            Arg::new("date")
                .long("date")
                .value_name("DDMMYYYY")
                .help("Day to show, defaults to today")
                .takes_value(true),
        )
        .arg(
            Arg::new("search")
                .long("search")
                .short('s')
                .value_name("TERM")
                .help("Filter by plate or customer name")
                .takes_value(true),
        )
        .arg(
            Arg::new("status")
                .long("status")
                .value_name("STATUS")
                .help("Todos, Aberta, Finalizada or Cancelada")
                .takes_value(true),
        )
        .arg(
            Arg::new("utc_offset")
                .long("utc-offset")
                .value_name("MINUTES")
                .help("Offset from UTC used for dates, e.g. -180")
                .takes_value(true)
                .allow_hyphen_values(true),
        )
        .arg(
            Arg::new("watch")
                .long("watch")
                .short('w')
                .help("Keep running and re-render on every change"),
        )
        .get_matches();

    let mut options = ClientOptions::default();
    if let Some(offset) = matches.value_of("utc_offset") {
        let minutes: i32 = offset.parse().context("--utc-offset must be a number of minutes")?;
        options = options.with_utc_offset_minutes(Some(minutes));
    }

    let database_url = matches
        .value_of("database_url")
        .context("--database-url is required")?;
    let service = OrderService::new_with_options(database_url, options.clone())?;

    let partition = match matches.value_of("date") {
        Some(key) => DatePartition::parse(key)?,
        None => service.today(),
    };

    let mut board = service.board();
    if let Some(term) = matches.value_of("search") {
        board.set_search_term(term);
    }
    if let Some(status) = matches.value_of("status") {
        board.set_status_filter(status.parse::<StatusFilter>()?);
    }

    let loaded = board.open(partition).await?;
    info!("Loaded {} orders for {}", loaded, partition);
    render(&board, &options);

    if !matches.is_present("watch") {
        return Ok(());
    }

    loop {
        tokio::select! {
            outcome = board.next_remote_event() => {
                if outcome.is_none() {
                    info!("Change feed closed");
                    break;
                }
                board.drain_pending();
                println!();
                render(&board, &options);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    board.close();
    Ok(())
}
