use std::sync::Arc;

use tokio::net::TcpStream;
use tokio::io::AsyncReadExt;

use crate::http::parser::{parse_http_request, ParseError};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;
use crate::relay::{Fetcher, RelayHandler};

pub struct Connection<F> {
    stream: TcpStream,
    buffer: Vec<u8>,
    state: ConnectionState,
    handler: Arc<RelayHandler<F>>,
}

pub enum ConnectionState {
    Reading,
    Processing(Request),
    Writing(ResponseWriter, bool), // bool = keep_alive?
    Closed,
}

enum ReadOutcome {
    Request(Request),
    Malformed(ParseError),
    Eof,
}

impl<F: Fetcher> Connection<F> {
    pub fn new(stream: TcpStream, handler: Arc<RelayHandler<F>>) -> Self {
        Self {
            stream,
            buffer: Vec::with_capacity(4096),
            state: ConnectionState::Reading,
            handler,
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            match &mut self.state {
                ConnectionState::Reading => {
                    match self.read_request().await? {
                        ReadOutcome::Request(req) => {
                            self.state = ConnectionState::Processing(req);
                        }
                        ReadOutcome::Malformed(e) => {
                            tracing::warn!(error = ?e, "Malformed request");
                            let rejection = match e {
                                ParseError::BodyTooLarge => Response::content_too_large(),
                                _ => Response::bad_request(),
                            };
                            let writer = ResponseWriter::new(&rejection);
                            self.state = ConnectionState::Writing(writer, false);
                        }
                        ReadOutcome::Eof => {
                            self.state = ConnectionState::Closed;
                        }
                    }
                }

                ConnectionState::Processing(req) => {
                    let keep_alive = req.keep_alive();
                    let response = self.handler.handle(req).await;

                    let writer = ResponseWriter::new(&response);
                    self.state = ConnectionState::Writing(writer, keep_alive);
                }

                ConnectionState::Writing(writer, keep_alive) => {
                    writer.write_to_stream(&mut self.stream).await?;

                    if *keep_alive {
                        self.state = ConnectionState::Reading; // go back for next request
                    } else {
                        self.state = ConnectionState::Closed;
                    }
                }

                ConnectionState::Closed => {
                    break;
                }
            }
        }

        Ok(())
    }

    async fn read_request(&mut self) -> anyhow::Result<ReadOutcome> {
        loop {
            // Try parsing whatever we already have
            match parse_http_request(&self.buffer) {
                Ok((request, consumed)) => {
                    // Remove consumed bytes
                    self.buffer.drain(..consumed);
                    return Ok(ReadOutcome::Request(request));
                }

                Err(ParseError::Incomplete) => {
                    // Need more data → fall through to read
                }

                Err(e) => {
                    return Ok(ReadOutcome::Malformed(e));
                }
            }

            // Read more data
            let mut temp = [0u8; 1024];
            let n = self.stream.read(&mut temp).await?;

            if n == 0 {
                // Client closed connection
                return Ok(ReadOutcome::Eof);
            }

            self.buffer.extend_from_slice(&temp[..n]);
        }
    }
}
