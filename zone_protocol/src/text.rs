use std::collections::VecDeque;
use std::fmt::Write as _;
use std::io::{self, BufRead, Write};
use std::num::ParseIntError;

use thiserror::Error;

use crate::{GameSetup, Position, TeamId, TurnObservation};

const UNOWNED: i64 = -1;

/// Frame lines the bot prints around a dump on stderr.
pub const DUMP_BEGIN: &str = "---- DUMP ----";
pub const DUMP_END: &str = "---- END DUMP ----";

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unexpected end of input while reading {context}")]
    UnexpectedEof { context: &'static str },
    #[error("invalid integer '{value}' for {context}: {source}")]
    InvalidInteger {
        value: String,
        context: &'static str,
        source: ParseIntError,
    },
    #[error("{context} out of range: {value}")]
    OutOfRange { value: i64, context: &'static str },
    #[error("failed to read protocol input: {0}")]
    Io(#[from] io::Error),
}

/// Whitespace tokenizer over the referee stream.
///
/// Line breaks carry no meaning; values are consumed in protocol order.
pub struct TokenReader<R> {
    reader: R,
    line: String,
    pending: VecDeque<String>,
}

impl<R: BufRead> TokenReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            pending: VecDeque::new(),
        }
    }

    pub fn read_setup(&mut self) -> Result<GameSetup, ProtocolError> {
        let team_count = self.expect_count("team count", 1)?;
        let my_team = self.expect_in_range("own team index", 0, team_count as i64 - 1)?;
        let agents_per_team = self.expect_count("agents per team", 1)?;
        let zone_count = self.expect_count("zone count", 1)?;

        let mut zones = Vec::with_capacity(zone_count);
        for _ in 0..zone_count {
            zones.push(self.expect_position("zone position")?);
        }

        Ok(GameSetup {
            team_count,
            my_team: TeamId(my_team as usize),
            agents_per_team,
            zones,
        })
    }

    /// Reads one turn. Returns `Ok(None)` when the stream ends cleanly before
    /// the first value of the turn.
    pub fn read_turn(
        &mut self,
        setup: &GameSetup,
    ) -> Result<Option<TurnObservation>, ProtocolError> {
        let Some(first) = self.next_token()? else {
            return Ok(None);
        };

        let mut owners = Vec::with_capacity(setup.zones.len());
        let mut token = Some(first);
        for _ in 0..setup.zones.len() {
            let value = match token.take() {
                Some(raw) => parse_i64(&raw, "zone owner")?,
                None => self.expect_i64("zone owner")?,
            };
            owners.push(parse_owner(value, setup.team_count)?);
        }

        let mut positions = Vec::with_capacity(setup.team_count);
        for _ in 0..setup.team_count {
            let mut team = Vec::with_capacity(setup.agents_per_team);
            for _ in 0..setup.agents_per_team {
                team.push(self.expect_position("agent position")?);
            }
            positions.push(team);
        }

        Ok(Some(TurnObservation { owners, positions }))
    }

    fn next_token(&mut self) -> Result<Option<String>, ProtocolError> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Ok(Some(token));
            }
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            self.pending
                .extend(self.line.split_whitespace().map(str::to_owned));
        }
    }

    fn expect_i64(&mut self, context: &'static str) -> Result<i64, ProtocolError> {
        let token = self
            .next_token()?
            .ok_or(ProtocolError::UnexpectedEof { context })?;
        parse_i64(&token, context)
    }

    fn expect_in_range(
        &mut self,
        context: &'static str,
        min: i64,
        max: i64,
    ) -> Result<i64, ProtocolError> {
        let value = self.expect_i64(context)?;
        if value < min || value > max {
            return Err(ProtocolError::OutOfRange { value, context });
        }
        Ok(value)
    }

    fn expect_count(&mut self, context: &'static str, min: i64) -> Result<usize, ProtocolError> {
        Ok(self.expect_in_range(context, min, i64::from(u16::MAX))? as usize)
    }

    fn expect_position(&mut self, context: &'static str) -> Result<Position, ProtocolError> {
        let x = self.expect_in_range(context, i64::from(i32::MIN), i64::from(i32::MAX))?;
        let y = self.expect_in_range(context, i64::from(i32::MIN), i64::from(i32::MAX))?;
        Ok(Position::new(x as i32, y as i32))
    }
}

fn parse_i64(value: &str, context: &'static str) -> Result<i64, ProtocolError> {
    value
        .parse::<i64>()
        .map_err(|source| ProtocolError::InvalidInteger {
            value: value.to_string(),
            context,
            source,
        })
}

fn parse_owner(value: i64, team_count: usize) -> Result<Option<TeamId>, ProtocolError> {
    match value {
        UNOWNED => Ok(None),
        v if v >= 0 && (v as usize) < team_count => Ok(Some(TeamId(v as usize))),
        v => Err(ProtocolError::OutOfRange {
            value: v,
            context: "zone owner",
        }),
    }
}

/// Writes one `x y` line per target and flushes, as the referee waits on the
/// complete answer before advancing.
pub fn write_targets<W: Write>(writer: &mut W, targets: &[Position]) -> io::Result<()> {
    for target in targets {
        writeln!(writer, "{target}")?;
    }
    writer.flush()
}

/// Renders the setup followed by a single turn in protocol form, so that a
/// captured turn can be replayed through [`TokenReader`].
pub fn render_dump(setup: &GameSetup, turn: &TurnObservation) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {} {} {}",
        setup.team_count,
        setup.my_team,
        setup.agents_per_team,
        setup.zones.len()
    );
    for zone in &setup.zones {
        let _ = writeln!(out, "{zone}");
    }
    for owner in &turn.owners {
        let value = owner.map_or(UNOWNED, |team| team.0 as i64);
        let _ = writeln!(out, "{value}");
    }
    for team in &turn.positions {
        for position in team {
            let _ = writeln!(out, "{position}");
        }
    }
    out
}

/// Parses a captured dump back into the setup and its single turn. Frame
/// lines are skipped, so stderr excerpts can be replayed as is.
pub fn read_dump(text: &str) -> Result<(GameSetup, TurnObservation), ProtocolError> {
    let body: String = text
        .lines()
        .filter(|line| {
            let line = line.trim();
            line != DUMP_BEGIN && line != DUMP_END
        })
        .flat_map(|line| [line, "\n"])
        .collect();

    let mut reader = TokenReader::new(body.as_bytes());
    let setup = reader.read_setup()?;
    let turn = reader
        .read_turn(&setup)?
        .ok_or(ProtocolError::UnexpectedEof {
            context: "zone owner",
        })?;
    Ok((setup, turn))
}
