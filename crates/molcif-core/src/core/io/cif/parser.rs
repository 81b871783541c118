use super::error::{CifError, CifParseErrorKind};
use super::reader::{LoopReadState, read_single_row, unexpected};
use super::tokenizer::{Token, TokenKind, Tokenizer, TokenizerState};
use crate::core::models::data::{Block, CifFile};
use std::sync::Arc;
use tracing::{debug, trace};

/// Tokens processed per [`CifParser::step`] unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStep {
    /// More input remains; `position` bytes of `total` have been consumed.
    Pending { position: usize, total: usize },
    Done,
}

#[derive(Debug)]
enum Status {
    Running,
    Done,
    Failed { line: usize, kind: CifParseErrorKind },
}

/// Resumable parser that processes a bounded number of tokens per step.
///
/// The parser owns the source text and keeps only the tokenizer state between
/// steps, so the caller decides when to yield, report progress or stop.
#[derive(Debug)]
pub struct CifParser {
    source: Arc<str>,
    state: TokenizerState,
    token: Token,
    chunk_size: usize,
    strict: bool,
    blocks: Vec<Block>,
    current: Block,
    open_loop: Option<LoopReadState>,
    status: Status,
}

impl CifParser {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        let source: Arc<str> = text.into();
        let (state, token) = {
            let mut tokenizer = Tokenizer::new(&source);
            let token = tokenizer.move_next();
            (tokenizer.state(), token)
        };
        Self {
            source,
            state,
            token,
            chunk_size: DEFAULT_CHUNK_SIZE,
            strict: false,
            blocks: Vec::new(),
            current: Block::new(""),
            open_loop: None,
            status: Status::Running,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// In strict mode an unterminated quoted or multiline value is an error.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn total(&self) -> usize {
        self.source.len()
    }

    pub fn position(&self) -> usize {
        self.state.position
    }

    /// Processes up to one chunk of tokens.
    ///
    /// # Errors
    ///
    /// Returns [`CifError::Parse`] on the first malformed construct. Once a step
    /// has failed, every later step reports the same error.
    pub fn step(&mut self) -> Result<ParseStep, CifError> {
        match &self.status {
            Status::Done => return Ok(ParseStep::Done),
            Status::Failed { line, kind } => return Err(CifError::parse(*line, kind.clone())),
            Status::Running => {}
        }

        let source = Arc::clone(&self.source);
        let mut tokenizer = Tokenizer::resume(&source, self.state, self.token);
        let result = self.advance_chunk(&mut tokenizer, &source);
        self.state = tokenizer.state();
        self.token = tokenizer.token();

        match result {
            Ok(ParseStep::Done) => {
                self.status = Status::Done;
                Ok(ParseStep::Done)
            }
            Ok(pending) => Ok(pending),
            Err(CifError::Parse { line, kind }) => {
                self.blocks.clear();
                self.current = Block::new("");
                self.open_loop = None;
                self.status = Status::Failed {
                    line,
                    kind: kind.clone(),
                };
                Err(CifError::Parse { line, kind })
            }
            Err(other) => Err(other),
        }
    }

    /// Runs the remaining steps and returns the parsed file.
    pub fn finish(mut self) -> Result<CifFile, CifError> {
        while self.step()? != ParseStep::Done {}
        Ok(CifFile::new(self.blocks))
    }

    fn advance_chunk(
        &mut self,
        tokenizer: &mut Tokenizer<'_>,
        source: &Arc<str>,
    ) -> Result<ParseStep, CifError> {
        let mut budget = self.chunk_size;
        loop {
            if let Some(mut open) = self.open_loop.take() {
                budget -= open.read_values(tokenizer, budget, self.strict)?;
                if tokenizer.token().kind == TokenKind::Value {
                    self.open_loop = Some(open);
                    return Ok(self.pending(tokenizer));
                }
                let category = open.finish(source)?;
                trace!(category = %category.name, rows = category.row_count(), "Read loop category");
                self.current.insert_category(category);
            }

            if budget == 0 {
                return Ok(self.pending(tokenizer));
            }

            let token = tokenizer.token();
            match token.kind {
                TokenKind::End => {
                    self.close_block("");
                    debug!(blocks = self.blocks.len(), "Reached end of input");
                    return Ok(ParseStep::Done);
                }
                TokenKind::Data => {
                    let header = tokenizer.text(token).get(5..).unwrap_or("");
                    self.close_block(header);
                    tokenizer.move_next();
                    budget -= 1;
                }
                TokenKind::Loop => {
                    self.open_loop = Some(LoopReadState::begin(tokenizer));
                    budget -= 1;
                }
                TokenKind::ColumnName => {
                    let category = read_single_row(tokenizer, source, self.strict)?;
                    budget = budget.saturating_sub(2 * category.field_count());
                    self.current.insert_category(category);
                }
                _ => {
                    return Err(unexpected(
                        tokenizer,
                        token,
                        "a data block, loop or column name",
                    ));
                }
            }
        }
    }

    /// Emits the open block if it holds any category and opens a new one.
    fn close_block(&mut self, next_header: &str) {
        let block = std::mem::replace(&mut self.current, Block::new(next_header));
        if !block.is_empty() {
            trace!(header = %block.header, categories = block.categories().len(), "Closed block");
            self.blocks.push(block);
        }
    }

    fn pending(&self, tokenizer: &Tokenizer<'_>) -> ParseStep {
        ParseStep::Pending {
            position: tokenizer.position(),
            total: self.source.len(),
        }
    }
}

/// Parses a complete CIF text in one call.
pub fn parse(text: &str) -> Result<CifFile, CifError> {
    CifParser::new(text).finish()
}
