use crate::uci::UciMove;
use crate::{EngineCommand, EngineEvent, GoLimits, PositionBase, Score, SearchInfo};

/// Encode a command as a single newline-free protocol line.
pub fn encode_command(cmd: &EngineCommand) -> String {
    match cmd {
        EngineCommand::Uci => "uci".to_string(),
        EngineCommand::IsReady => "isready".to_string(),
        EngineCommand::SetOption { name, value } => match value {
            Some(value) => format!("setoption name {} value {}", name, value),
            None => format!("setoption name {}", name),
        },
        EngineCommand::Position { base, moves } => {
            let mut line = match base {
                PositionBase::Startpos => "position startpos".to_string(),
                PositionBase::Fen(fen) => format!("position fen {}", fen),
            };
            if !moves.is_empty() {
                line.push_str(" moves");
                for mv in moves {
                    line.push(' ');
                    line.push_str(mv.as_str());
                }
            }
            line
        }
        EngineCommand::Go(limits) => {
            if let Some(movetime) = limits.movetime {
                format!("go movetime {}", movetime)
            } else if let Some(depth) = limits.depth {
                format!("go depth {}", depth)
            } else if limits.infinite {
                "go infinite".to_string()
            } else {
                // Default 1 second
                "go movetime 1000".to_string()
            }
        }
        EngineCommand::Stop => "stop".to_string(),
        EngineCommand::Quit => "quit".to_string(),
    }
}

/// Decode one line of engine output.
///
/// This is a total function: unrecognized or malformed lines decode to
/// [`EngineEvent::ProtocolError`] instead of failing, so isolated corruption
/// in the stream never takes the whole session down.
pub fn decode_line(line: &str) -> EngineEvent {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    match tokens.first() {
        Some(&"uciok") => EngineEvent::UciOk,
        Some(&"readyok") => EngineEvent::ReadyOk,

        Some(&"id") => {
            if tokens.len() < 3 {
                return protocol_error(line, "id line without a payload");
            }
            let value = tokens[2..].join(" ");
            match tokens[1] {
                "name" => EngineEvent::Id {
                    name: Some(value),
                    author: None,
                },
                "author" => EngineEvent::Id {
                    name: None,
                    author: Some(value),
                },
                other => protocol_error(line, &format!("unknown id field: {}", other)),
            }
        }

        Some(&"option") => decode_option_line(line, &tokens[1..]),

        Some(&"bestmove") => {
            let Some(raw_mv) = tokens.get(1) else {
                return protocol_error(line, "bestmove without a move");
            };
            let mv = match UciMove::parse(raw_mv) {
                Ok(mv) => mv,
                Err(e) => return protocol_error(line, &e.to_string()),
            };
            // A malformed ponder hint is dropped, not fatal to the line.
            let ponder = if tokens.get(2) == Some(&"ponder") {
                tokens.get(3).and_then(|s| UciMove::parse(s).ok())
            } else {
                None
            };
            EngineEvent::BestMove { mv, ponder }
        }

        Some(&"info") => EngineEvent::Info(decode_info_line(&tokens[1..])),

        Some(_) => protocol_error(line, "unknown message"),
        None => protocol_error(line, "empty line"),
    }
}

fn protocol_error(line: &str, reason: &str) -> EngineEvent {
    EngineEvent::ProtocolError {
        raw_line: line.to_string(),
        reason: reason.to_string(),
    }
}

/// Decode an `option name <n> type <t> …` declaration.
fn decode_option_line(line: &str, tokens: &[&str]) -> EngineEvent {
    if tokens.first() != Some(&"name") {
        return protocol_error(line, "option line without a name");
    }
    let type_at = tokens.iter().position(|&t| t == "type");
    let name_end = type_at.unwrap_or(tokens.len());
    if name_end <= 1 {
        return protocol_error(line, "option line without a name");
    }
    EngineEvent::OptionDeclared {
        name: tokens[1..name_end].join(" "),
        spec: type_at.map(|i| tokens[i..].join(" ")).unwrap_or_default(),
    }
}

/// Decode an `info` line from the engine.
///
/// A missing or non-numeric field drops only that field; the rest of the
/// line still decodes.
fn decode_info_line(tokens: &[&str]) -> SearchInfo {
    let mut info = SearchInfo::default();
    let mut i = 0;

    while i < tokens.len() {
        match tokens[i] {
            "depth" => {
                i += 1;
                info.depth = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "time" => {
                i += 1;
                info.time_ms = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "nodes" => {
                i += 1;
                info.nodes = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "nps" => {
                i += 1;
                info.nps = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "score" => {
                i += 1;
                if let Some(&score_type) = tokens.get(i) {
                    i += 1;
                    if let Some(value_str) = tokens.get(i) {
                        info.score = match score_type {
                            "cp" => value_str.parse().ok().map(Score::Centipawns),
                            "mate" => value_str.parse().ok().map(Score::Mate),
                            _ => None,
                        };
                    }
                }
            }
            "pv" => {
                // Collect all moves until next keyword
                i += 1;
                while i < tokens.len() && !is_keyword(tokens[i]) {
                    if let Ok(mv) = UciMove::parse(tokens[i]) {
                        info.pv.push(mv);
                    }
                    i += 1;
                }
                continue; // Don't increment i again
            }
            _ => {
                // Unknown keyword, skip
            }
        }
        i += 1;
    }

    info
}

fn is_keyword(token: &str) -> bool {
    matches!(
        token,
        "depth"
            | "seldepth"
            | "time"
            | "nodes"
            | "score"
            | "pv"
            | "multipv"
            | "currmove"
            | "hashfull"
            | "nps"
            | "tbhits"
            | "cpuload"
            | "string"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(s: &str) -> UciMove {
        UciMove::parse(s).unwrap()
    }

    #[test]
    fn test_encode_handshake() {
        assert_eq!(encode_command(&EngineCommand::Uci), "uci");
        assert_eq!(encode_command(&EngineCommand::IsReady), "isready");
        assert_eq!(encode_command(&EngineCommand::Stop), "stop");
        assert_eq!(encode_command(&EngineCommand::Quit), "quit");
    }

    #[test]
    fn test_encode_setoption() {
        let cmd = EngineCommand::SetOption {
            name: "Skill Level".to_string(),
            value: Some("10".to_string()),
        };
        assert_eq!(encode_command(&cmd), "setoption name Skill Level value 10");

        let cmd = EngineCommand::SetOption {
            name: "Ponder".to_string(),
            value: None,
        };
        assert_eq!(encode_command(&cmd), "setoption name Ponder");
    }

    #[test]
    fn test_encode_position_startpos() {
        let cmd = EngineCommand::Position {
            base: PositionBase::Startpos,
            moves: vec![mv("e2e4"), mv("e7e5")],
        };
        assert_eq!(encode_command(&cmd), "position startpos moves e2e4 e7e5");
    }

    #[test]
    fn test_encode_position_fen_no_moves() {
        let fen = "7k/5Q2/5K2/8/8/8/8/8 w - - 0 1";
        let cmd = EngineCommand::Position {
            base: PositionBase::Fen(fen.to_string()),
            moves: vec![],
        };
        assert_eq!(encode_command(&cmd), format!("position fen {}", fen));
    }

    #[test]
    fn test_encode_go() {
        let cmd = EngineCommand::Go(GoLimits {
            movetime: Some(1000),
            ..Default::default()
        });
        assert_eq!(encode_command(&cmd), "go movetime 1000");

        let cmd = EngineCommand::Go(GoLimits {
            depth: Some(8),
            ..Default::default()
        });
        assert_eq!(encode_command(&cmd), "go depth 8");

        assert_eq!(
            encode_command(&EngineCommand::Go(GoLimits::default())),
            "go movetime 1000"
        );
    }

    #[test]
    fn test_decode_id_and_readyok() {
        match decode_line("id name Stockfish 16") {
            EngineEvent::Id { name, author } => {
                assert_eq!(name.as_deref(), Some("Stockfish 16"));
                assert!(author.is_none());
            }
            other => panic!("Wrong event: {:?}", other),
        }
        assert!(matches!(decode_line("readyok"), EngineEvent::ReadyOk));
        assert!(matches!(decode_line("uciok"), EngineEvent::UciOk));
    }

    #[test]
    fn test_decode_bestmove() {
        match decode_line("bestmove e2e4 ponder e7e5") {
            EngineEvent::BestMove { mv, ponder } => {
                assert_eq!(mv.as_str(), "e2e4");
                assert_eq!(ponder.unwrap().as_str(), "e7e5");
            }
            other => panic!("Wrong event: {:?}", other),
        }
    }

    #[test]
    fn test_decode_bestmove_bad_ponder_dropped() {
        match decode_line("bestmove e2e4 ponder xx") {
            EngineEvent::BestMove { mv, ponder } => {
                assert_eq!(mv.as_str(), "e2e4");
                assert!(ponder.is_none());
            }
            other => panic!("Wrong event: {:?}", other),
        }
    }

    #[test]
    fn test_decode_info() {
        match decode_line("info depth 12 score cp 35 nodes 15234 time 120 pv e2e4 e7e5") {
            EngineEvent::Info(info) => {
                assert_eq!(info.depth, Some(12));
                assert_eq!(info.score, Some(Score::Centipawns(35)));
                assert_eq!(info.nodes, Some(15234));
                assert_eq!(info.time_ms, Some(120));
                assert_eq!(info.pv.len(), 2);
            }
            other => panic!("Wrong event: {:?}", other),
        }
    }

    #[test]
    fn test_decode_info_mate_score() {
        match decode_line("info depth 20 score mate -3") {
            EngineEvent::Info(info) => assert_eq!(info.score, Some(Score::Mate(-3))),
            other => panic!("Wrong event: {:?}", other),
        }
    }

    #[test]
    fn test_decode_info_bad_field_dropped() {
        // "nodes" value is garbage — only that field is lost
        match decode_line("info depth 12 nodes abc score cp 35") {
            EngineEvent::Info(info) => {
                assert_eq!(info.depth, Some(12));
                assert!(info.nodes.is_none());
                assert_eq!(info.score, Some(Score::Centipawns(35)));
            }
            other => panic!("Wrong event: {:?}", other),
        }
    }

    #[test]
    fn test_decode_option() {
        match decode_line("option name Skill Level type spin default 20 min 0 max 20") {
            EngineEvent::OptionDeclared { name, spec } => {
                assert_eq!(name, "Skill Level");
                assert_eq!(spec, "type spin default 20 min 0 max 20");
            }
            other => panic!("Wrong event: {:?}", other),
        }
    }

    #[test]
    fn test_decode_malformed_is_protocol_error() {
        for line in ["infoo depth abc", "bestmove", "bestmove (none)", "id name", ""] {
            assert!(
                matches!(decode_line(line), EngineEvent::ProtocolError { .. }),
                "expected protocol error for {:?}",
                line
            );
        }
    }
}
