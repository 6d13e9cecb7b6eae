use crate::cli::{parse_hex, StimAction, StimArgs};
use crate::exit_codes;
use bcpi_rs::StimMessage;

pub fn execute(args: StimArgs) -> i32 {
    match args.action {
        StimAction::Encode { value } => match StimMessage::from_value(value) {
            Ok(msg) => {
                let hex: String = msg.to_bytes().iter().map(|b| format!("{:02x}", b)).collect();
                println!("{}", hex);
                exit_codes::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                exit_codes::INPUT_ERROR
            }
        },
        StimAction::Decode { hex } => {
            match parse_hex(&hex).and_then(|bytes| {
                StimMessage::from_bytes(&bytes).map_err(|e| e.to_string())
            }) {
                Ok(msg) => {
                    println!("{}", msg.value);
                    exit_codes::SUCCESS
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    exit_codes::INPUT_ERROR
                }
            }
        }
    }
}
