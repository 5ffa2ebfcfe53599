// src/cli.rs
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "reimburse-autofill")]
#[command(version, about = "Fill the reimbursement system from spreadsheet records")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Enter every record group into the reimbursement page (default)
    Run(RunArgs),

    /// Desktop input helpers for native dialogs
    Desktop {
        #[command(subcommand)]
        op: DesktopOp,
    },
}

#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Reimbursement records workbook
    #[arg(long, env = "RECORDS_FILE")]
    pub records: Option<PathBuf>,

    /// Title -> element id mapping workbook
    #[arg(long, env = "MAPPING_FILE")]
    pub mapping: Option<PathBuf>,

    /// Worksheet of the records workbook (first sheet when omitted)
    #[arg(long, env = "RECORDS_SHEET")]
    pub sheet: Option<String>,

    /// Reimbursement system entry page
    #[arg(long, env = "TARGET_URL")]
    pub url: Option<String>,

    /// Dropdown and date rules (JSON)
    #[arg(long, env = "FIELD_RULES_FILE")]
    pub field_rules: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum DesktopOp {
    /// Verify xdotool and the display are usable
    Check,

    /// Print the current pointer position
    Position,

    /// Click at screen coordinates
    Click { x: i32, y: i32 },

    /// Move the pointer without clicking
    Move { x: i32, y: i32 },

    /// Scroll the wheel; positive scrolls up, negative down
    Scroll {
        #[arg(allow_negative_numbers = true)]
        clicks: i32,
    },

    /// Save the open print preview as a PDF
    PrintDialog {
        #[arg(long)]
        filepath: String,
        #[arg(long)]
        filename: String,
        #[arg(long, env = "DIALOG_COORDINATES_FILE")]
        coordinates_file: Option<PathBuf>,
    },

    /// Drive a generic save-as dialog
    FileSave {
        #[arg(long)]
        filepath: String,
        #[arg(long)]
        filename: String,
        /// `{"button":[x,y],"filepath_input":[x,y],"filename_input":[x,y],"save_button":[x,y]}`;
        /// the `file_save` entry of the coordinates file when omitted
        #[arg(long)]
        coordinates: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_run() {
        let cli = Cli::parse_from(["reimburse-autofill"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn print_dialog_arguments() {
        let cli = Cli::parse_from([
            "reimburse-autofill",
            "desktop",
            "print-dialog",
            "--filepath",
            "/tmp/pdf",
            "--filename",
            "报销单.pdf",
            "--coordinates-file",
            "coords.json",
        ]);
        match cli.command {
            Some(Commands::Desktop {
                op:
                    DesktopOp::PrintDialog {
                        filepath,
                        filename,
                        coordinates_file,
                    },
            }) => {
                assert_eq!(filepath, "/tmp/pdf");
                assert_eq!(filename, "报销单.pdf");
                assert_eq!(coordinates_file, Some(PathBuf::from("coords.json")));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn scroll_accepts_negative_clicks() {
        let cli = Cli::parse_from(["reimburse-autofill", "desktop", "scroll", "-3"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Desktop { op: DesktopOp::Scroll { clicks: -3 } })
        ));
    }
}
