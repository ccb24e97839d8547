use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(name = "reco", about = "Marketplace recommendation ML core")]
pub struct Args {
    /// Data directory (config, model cache, booking export, rule snapshot)
    #[clap(long, default_value = ".reco")]
    pub data_dir: String,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP daemon exposing the query surface
    Daemon {
        /// Address to listen on
        #[clap(long, default_value = "0.0.0.0:8080")]
        listen: String,
    },

    /// Run one batch mining pass over the booking export.
    /// This is the entry point an external scheduler (cron) invokes.
    Mine {
        /// Booking export CSV (group_id,status,category,created_at)
        #[clap(long)]
        bookings: PathBuf,

        /// Output file for the rule snapshot
        #[clap(long)]
        out: PathBuf,

        /// Optional event-type context attached to every mined rule
        #[clap(long)]
        event_type: Option<String>,

        /// Override the configured trailing window
        #[clap(long)]
        window_days: Option<i64>,
    },

    /// Embed one or more texts and print the vector summaries
    Embed {
        /// Texts to embed
        #[clap(required = true)]
        texts: Vec<String>,
    },

    /// Detect life events from behavior signals
    Detect {
        /// Recent search query (repeatable)
        #[clap(long = "search")]
        searches: Vec<String>,

        /// Viewed category slug (repeatable)
        #[clap(long = "viewed")]
        viewed: Vec<String>,

        /// Booked category slug (repeatable)
        #[clap(long = "booked")]
        booked: Vec<String>,
    },
}
