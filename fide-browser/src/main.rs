#![cfg_attr(not(target_arch = "wasm32"), deny(unused_crate_dependencies))]

#[cfg(not(target_arch = "wasm32"))]
mod main_impl {
    use std::io::{BufRead, Write};
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::mpsc::{self, RecvTimeoutError};
    use std::time::Duration;

    use clap::Parser;
    use eyre::{Result, bail};
    use libfide::{
        BrowserState, FideConfig, HttpFetcher, LoadStatus, MemoryAddressBar, Message,
        PageController, Player, logs,
    };
    use tracing::info;

    const HELP: &str = "\
commands:
  next | n               show the next page
  prev | p               show the previous page
  country <CODE>         only players of one federation, `country` alone for all
  search <text>          search by name, `search` alone clears
  sort <column>          sort by a column, again to reverse
  select <row>           copy the FIDE id of a row
  retry                  repeat the request that failed
  countries              list the federations
  help                   this text
  quit | q";

    #[derive(clap::Subcommand)]
    enum Commands {
        /// Serve a FIDE player list over the same API the browser uses
        Serve {
            /// Player list in XML (as published by FIDE) or JSON format
            players: PathBuf,
            /// Port on which server will listen
            #[clap(long)]
            port: Option<u16>,
            /// IP address to bind the server to
            #[clap(long)]
            bind_address: Option<String>,
        },
    }

    #[derive(clap::Parser)]
    #[command(version, about)]
    struct Args {
        /// Address (`host:port`) of a local fide-server to browse instead of the public API
        #[clap(long)]
        server: Option<String>,
        /// Base URL of the paginated player table
        #[clap(long)]
        players_url: Option<String>,
        /// URL returning the list of federations
        #[clap(long)]
        countries_url: Option<String>,
        /// Rows per page
        #[clap(long)]
        page_size: Option<usize>,
        /// Initial view, e.g. `country=NOR&sort=rating&order=desc`
        #[clap(long)]
        query: Option<String>,

        #[command(subcommand)]
        command: Option<Commands>,
    }

    impl Args {
        /// Applies command line overrides on top of the loaded configuration.
        fn apply_to(&self, config: &mut FideConfig) {
            if let Some(server) = &self.server {
                config.api.players_url =
                    format!("http://{server}{}", fide_server::PLAYERS_TABLE_PATH);
                config.api.countries_url = format!(
                    "http://{server}{}?sql=select+distinct%28country%29+from+players%3B",
                    fide_server::PLAYERS_DATABASE_PATH
                );
                config.api.upgrade_next_url_scheme = false;
            }
            if let Some(url) = &self.players_url {
                config.api.players_url = url.clone();
            }
            if let Some(url) = &self.countries_url {
                config.api.countries_url = url.clone();
            }
            if let Some(page_size) = self.page_size {
                config.api.page_size = page_size;
            }
        }
    }

    #[derive(Debug, PartialEq, Eq)]
    enum Command {
        Next,
        Previous,
        Country(Option<String>),
        Search(String),
        Sort(String),
        /// 1-based row on screen
        Select(usize),
        Retry,
        Countries,
        Help,
        Quit,
    }

    fn parse_command(line: &str) -> Result<Command> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(word, rest)| (word, rest.trim()));
        let command = match word {
            "next" | "n" => Command::Next,
            "prev" | "p" => Command::Previous,
            "country" => Command::Country((!rest.is_empty()).then(|| rest.to_uppercase())),
            "search" => Command::Search(rest.to_string()),
            "sort" if !rest.is_empty() => Command::Sort(rest.to_string()),
            "sort" => bail!("sort needs a column name"),
            "select" => match rest.parse::<usize>() {
                Ok(row) if row > 0 => Command::Select(row),
                _ => bail!("select needs a row number"),
            },
            "retry" => Command::Retry,
            "countries" => Command::Countries,
            "help" | "?" => Command::Help,
            "quit" | "q" | "exit" => Command::Quit,
            other => bail!("Unknown command '{other}', type `help` for a list"),
        };
        Ok(command)
    }

    fn or_dash<T: ToString>(value: &Option<T>) -> String {
        value
            .as_ref()
            .map_or_else(|| "-".to_string(), ToString::to_string)
    }

    fn render(state: &BrowserState) -> String {
        let filter = &state.filter;
        let mut lines = vec![
            String::new(),
            format!(
                "page {} | country: {} | search: {} | sort: {} {}",
                state.page_number(),
                filter.country.as_deref().unwrap_or("all"),
                filter.search_text.as_deref().unwrap_or("-"),
                filter.sort_key,
                if filter.sort_ascending { "asc" } else { "desc" },
            ),
            format!(
                "{:>3}  {:<9} {:<32} {:<4} {:<5} {:>5} {:>5} {:>5} {:>5}",
                "#", "fideid", "name", "fed", "title", "std", "rapid", "blitz", "born"
            ),
        ];
        for (index, player) in state.view.rows.iter().enumerate() {
            let marker = if state.selected == Some(player.fideid) {
                '*'
            } else {
                ' '
            };
            lines.push(format!(
                "{:>3}{marker} {:<9} {:<32} {:<4} {:<5} {:>5} {:>5} {:>5} {:>5}",
                index + 1,
                player.fideid,
                or_dash(&player.name),
                or_dash(&player.country),
                or_dash(&player.title),
                or_dash(&player.rating),
                or_dash(&player.rapid_rating),
                or_dash(&player.blitz_rating),
                or_dash(&player.birthday),
            ));
        }
        if state.view.rows.is_empty() && matches!(state.view.status, LoadStatus::Loaded { .. }) {
            lines.push("  no players found".to_string());
        }
        lines.push(match &state.view.status {
            LoadStatus::Idle => "waiting for input".to_string(),
            LoadStatus::Loading { .. } => "loading...".to_string(),
            LoadStatus::Loaded { .. } if state.view.next_url.is_some() => {
                "`next` for more".to_string()
            }
            LoadStatus::Loaded { .. } => "last page".to_string(),
            LoadStatus::Failed { error, .. } => format!("error: {error}, `retry` to try again"),
        });
        if state.view.toast_visible {
            lines.push("copied!".to_string());
        }
        lines.join("\n") + "\n"
    }

    fn print_screen(screen: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = write!(stdout, "{screen}> ");
        let _ = stdout.flush();
    }

    fn run_browser(controller: &mut PageController) {
        let (input_sender, input_receiver) = mpsc::channel::<String>();
        std::thread::spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if input_sender.send(line).is_err() {
                    break;
                }
            }
        });

        let mut last_screen = String::new();
        loop {
            controller.handle_async_messages();
            let screen = render(controller.state());
            if screen != last_screen {
                print_screen(&screen);
                last_screen = screen;
            }

            let line = match input_receiver.recv_timeout(Duration::from_millis(50)) {
                Ok(line) => line,
                Err(RecvTimeoutError::Timeout) => continue,
                // Input closed: finish what is in flight, then stop.
                Err(RecvTimeoutError::Disconnected) => {
                    if !controller.has_pending_work() {
                        break;
                    }
                    std::thread::sleep(Duration::from_millis(10));
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            let message = match parse_command(&line) {
                Ok(Command::Quit) => break,
                Ok(Command::Help) => {
                    println!("{HELP}");
                    last_screen.clear();
                    continue;
                }
                Ok(Command::Countries) => {
                    println!("{}", controller.state().countries.join(" "));
                    last_screen.clear();
                    continue;
                }
                Ok(Command::Select(row)) => match controller.state().view.rows.get(row - 1) {
                    Some(player) => Message::SelectPlayer(player.clone()),
                    None => {
                        println!("No row {row} on this page");
                        continue;
                    }
                },
                Ok(Command::Next) => Message::NextPage,
                Ok(Command::Previous) => Message::PreviousPage,
                Ok(Command::Country(country)) => Message::SetCountry(country),
                Ok(Command::Search(text)) => Message::SetSearchText(text),
                Ok(Command::Sort(column)) => Message::SortBy(column),
                Ok(Command::Retry) => Message::Retry,
                Err(e) => {
                    println!("{e}");
                    continue;
                }
            };
            let selected = matches!(message, Message::SelectPlayer(_));
            controller.update(message);
            if selected {
                controller.update(Message::ShowToast);
            }
        }
    }

    pub(crate) fn main() -> Result<()> {
        simple_eyre::install()?;

        logs::start_logging()?;

        // Fetches and timers run on the runtime's worker while the main thread reads input.
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()?;

        let mut args = Args::parse();
        let mut config = FideConfig::new(false)?;

        if let Some(Commands::Serve {
            players,
            port,
            bind_address,
        }) = args.command.take()
        {
            // Use CLI override if provided, otherwise use config setting
            let bind_addr = bind_address.unwrap_or(config.server.bind_address);
            let port = port.unwrap_or(config.server.port);
            return runtime.block_on(fide_server::server_main(port, bind_addr, &players, None));
        }

        args.apply_to(&mut config);
        let _enter = runtime.enter();

        let address_bar = MemoryAddressBar::new(args.query.as_deref().unwrap_or(""));
        let mut controller =
            PageController::new(config, Arc::new(HttpFetcher), Box::new(address_bar.clone()))?
                .with_selection_callback(Box::new(|player: &Player| {
                    println!("FIDE id {} copied", player.fideid);
                }));
        controller.start();
        run_browser(&mut controller);

        let query = libfide::AddressBar::query(&address_bar);
        if query.is_empty() {
            info!("No view to resume");
        } else {
            println!("resume this view with --query '{query}'");
        }
        Ok(())
    }

}

#[cfg(target_arch = "wasm32")]
mod main_impl {
    // The browser build embeds `libfide` directly, there is no terminal to drive.
    pub(crate) fn main() -> eyre::Result<()> {
        simple_eyre::install()?;
        eyre::bail!("fide-browser has no terminal front-end on wasm32")
    }
}

fn main() -> eyre::Result<()> {
    main_impl::main()
}
