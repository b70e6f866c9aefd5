// Framed stdio transport
//
// Accepts newline-delimited JSON and `Content-Length` framed messages on
// the same stream. Each reply is written in the framing of its request.

use crate::protocol::{JsonRpcError, JsonRpcResponse};
use crate::server::McpServer;
use anyhow::{Context, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Decoder, Encoder, FramedRead, FramedWrite};

/// Largest accepted message body.
pub const MAX_FRAME_LENGTH: usize = 4 * 1024 * 1024;

/// Largest accepted `Content-Length` header block.
const MAX_HEADER_LENGTH: usize = 8 * 1024;

const CONTENT_LENGTH: &[u8] = b"content-length:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    Line,
    ContentLength,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Message { framing: Framing, payload: Bytes },
    /// A frame that had to be thrown away; the reader stays usable.
    Invalid { framing: Framing, reason: String },
}

#[derive(Debug, Clone)]
pub struct Outbound {
    pub framing: Framing,
    pub payload: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Codec for both framings. Oversized or malformed frames are surfaced as
/// [`Inbound::Invalid`] instead of errors so the stream keeps going.
#[derive(Debug, Default)]
pub struct FrameCodec {
    /// Bytes still to drop from an oversized `Content-Length` body.
    skip_bytes: usize,
    /// Dropping the rest of an oversized line.
    skip_line: bool,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::default()
    }

    fn decode_headers(&mut self, buf: &mut BytesMut) -> Option<Inbound> {
        let crlf = find(buf, b"\r\n\r\n").map(|pos| (pos, 4));
        let lf = find(buf, b"\n\n").map(|pos| (pos, 2));
        let end = match (crlf, lf) {
            (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
            (a, b) => a.or(b),
        };

        let Some((header_end, separator_len)) = end else {
            if buf.len() > MAX_HEADER_LENGTH {
                buf.clear();
                self.skip_line = true;
                return Some(Inbound::Invalid {
                    framing: Framing::ContentLength,
                    reason: "header block too large".to_string(),
                });
            }
            return None;
        };

        let length = std::str::from_utf8(&buf[..header_end])
            .ok()
            .and_then(|headers| {
                headers.lines().find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    if name.trim().eq_ignore_ascii_case("content-length") {
                        value.trim().parse::<usize>().ok()
                    } else {
                        None
                    }
                })
            });

        let Some(length) = length else {
            buf.advance(header_end + separator_len);
            return Some(Inbound::Invalid {
                framing: Framing::ContentLength,
                reason: "missing or invalid Content-Length".to_string(),
            });
        };

        if length > MAX_FRAME_LENGTH {
            buf.advance(header_end + separator_len);
            self.skip_bytes = length;
            self.drain_skipped(buf);
            return Some(Inbound::Invalid {
                framing: Framing::ContentLength,
                reason: format!("frame of {} bytes exceeds limit", length),
            });
        }

        let body_start = header_end + separator_len;
        if buf.len() < body_start + length {
            buf.reserve(body_start + length - buf.len());
            return None;
        }

        buf.advance(body_start);
        let payload = buf.split_to(length).freeze();
        Some(Inbound::Message {
            framing: Framing::ContentLength,
            payload,
        })
    }

    fn decode_line(&mut self, buf: &mut BytesMut) -> Option<Inbound> {
        match buf.iter().position(|b| *b == b'\n') {
            Some(pos) => {
                let mut line = buf.split_to(pos + 1);
                line.truncate(pos);
                if line.last() == Some(&b'\r') {
                    line.truncate(pos - 1);
                }
                if line.len() > MAX_FRAME_LENGTH {
                    return Some(Inbound::Invalid {
                        framing: Framing::Line,
                        reason: format!("frame of {} bytes exceeds limit", line.len()),
                    });
                }
                Some(Inbound::Message {
                    framing: Framing::Line,
                    payload: line.freeze(),
                })
            }
            None if buf.len() > MAX_FRAME_LENGTH => {
                let dropped = buf.len();
                buf.clear();
                self.skip_line = true;
                Some(Inbound::Invalid {
                    framing: Framing::Line,
                    reason: format!("frame of more than {} bytes exceeds limit", dropped),
                })
            }
            None => None,
        }
    }

    fn drain_skipped(&mut self, buf: &mut BytesMut) {
        let n = self.skip_bytes.min(buf.len());
        buf.advance(n);
        self.skip_bytes -= n;
    }
}

impl Decoder for FrameCodec {
    type Item = Inbound;
    type Error = FrameError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Inbound>, FrameError> {
        if self.skip_bytes > 0 {
            self.drain_skipped(buf);
            if self.skip_bytes > 0 {
                return Ok(None);
            }
        }

        if self.skip_line {
            match buf.iter().position(|b| *b == b'\n') {
                Some(pos) => {
                    buf.advance(pos + 1);
                    self.skip_line = false;
                }
                None => {
                    buf.clear();
                    return Ok(None);
                }
            }
        }

        // Blank lines between messages are not frames
        let leading = buf.iter().take_while(|b| b.is_ascii_whitespace()).count();
        buf.advance(leading);
        if buf.is_empty() {
            return Ok(None);
        }

        if starts_with_ignore_case(buf, CONTENT_LENGTH) {
            Ok(self.decode_headers(buf))
        } else if CONTENT_LENGTH.len() > buf.len()
            && starts_with_ignore_case(CONTENT_LENGTH, buf)
        {
            // Could still become a header; wait for more input
            Ok(None)
        } else {
            Ok(self.decode_line(buf))
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Inbound>, FrameError> {
        if let Some(frame) = self.decode(buf)? {
            return Ok(Some(frame));
        }
        if buf.is_empty() || self.skip_bytes > 0 || starts_with_ignore_case(buf, CONTENT_LENGTH) {
            buf.clear();
            return Ok(None);
        }

        // Final line without a trailing newline
        let payload = buf.split().freeze();
        Ok(Some(Inbound::Message {
            framing: Framing::Line,
            payload,
        }))
    }
}

impl Encoder<Outbound> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Outbound, dst: &mut BytesMut) -> Result<(), FrameError> {
        match item.framing {
            Framing::Line => {
                dst.reserve(item.payload.len() + 1);
                dst.put_slice(&item.payload);
                dst.put_u8(b'\n');
            }
            Framing::ContentLength => {
                let header = format!("Content-Length: {}\r\n\r\n", item.payload.len());
                dst.reserve(header.len() + item.payload.len());
                dst.put_slice(header.as_bytes());
                dst.put_slice(&item.payload);
            }
        }
        Ok(())
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn starts_with_ignore_case(haystack: &[u8], prefix: &[u8]) -> bool {
    haystack.len() >= prefix.len() && haystack[..prefix.len()].eq_ignore_ascii_case(prefix)
}

/// Serve one client over a byte stream until end of input.
///
/// Messages are handled one at a time, so replies keep request order.
pub async fn serve<R, W>(server: &McpServer, reader: R, writer: W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut frames = FramedRead::new(reader, FrameCodec::new());
    let mut sink = FramedWrite::new(writer, FrameCodec::new());

    while let Some(frame) = frames.next().await {
        let frame = frame.context("Failed to read from input stream")?;

        let (framing, response) = match frame {
            Inbound::Message { framing, payload } => (framing, server.process(&payload).await),
            Inbound::Invalid { framing, reason } => {
                tracing::warn!(reason = %reason, "Dropped invalid frame");
                (
                    framing,
                    Some(JsonRpcResponse::error(Value::Null, JsonRpcError::parse_error())),
                )
            }
        };

        if let Some(response) = response {
            let payload = serde_json::to_vec(&response).context("Failed to encode response")?;
            sink.send(Outbound { framing, payload })
                .await
                .context("Failed to write response")?;
        }
    }

    tracing::info!("Input closed, stopping stdio transport");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ServerInfo;
    use crate::tools::default_registry;
    use searxng_core::backend::MockBackend;
    use searxng_core::{EngineConfig, HtmlExtractor};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;

    fn decode_all(input: &[u8]) -> Vec<Inbound> {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(input);
        let mut frames = Vec::new();
        while let Some(frame) = codec.decode(&mut buf).unwrap() {
            frames.push(frame);
        }
        if let Some(frame) = codec.decode_eof(&mut buf).unwrap() {
            frames.push(frame);
        }
        frames
    }

    fn message(framing: Framing, payload: &str) -> Inbound {
        Inbound::Message {
            framing,
            payload: Bytes::copy_from_slice(payload.as_bytes()),
        }
    }

    #[test]
    fn test_decode_lines() {
        let frames = decode_all(b"{\"a\":1}\r\n\n{\"b\":2}\n{\"c\":3}");
        assert_eq!(
            frames,
            vec![
                message(Framing::Line, "{\"a\":1}"),
                message(Framing::Line, "{\"b\":2}"),
                message(Framing::Line, "{\"c\":3}"),
            ]
        );
    }

    #[test]
    fn test_decode_content_length() {
        let frames = decode_all(b"Content-Length: 7\r\n\r\n{\"a\":1}content-length: 2\r\n\r\n{}");
        assert_eq!(
            frames,
            vec![
                message(Framing::ContentLength, "{\"a\":1}"),
                message(Framing::ContentLength, "{}"),
            ]
        );
    }

    #[test]
    fn test_partial_content_length_waits() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&b"Content-Len"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b"gth: 4\r\n\r\n{}");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b"  ");
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(message(Framing::ContentLength, "{}  "))
        );
    }

    #[test]
    fn test_oversized_content_length_is_skipped() {
        let mut codec = FrameCodec::new();
        let mut input = format!("Content-Length: {}\r\n\r\n", MAX_FRAME_LENGTH + 1).into_bytes();
        input.extend(std::iter::repeat(b'x').take(MAX_FRAME_LENGTH + 1));
        input.extend_from_slice(b"{\"ok\":true}\n");
        let mut buf = BytesMut::from(&input[..]);

        assert!(matches!(
            codec.decode(&mut buf).unwrap(),
            Some(Inbound::Invalid { framing: Framing::ContentLength, .. })
        ));
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(message(Framing::Line, "{\"ok\":true}"))
        );
    }

    #[test]
    fn test_encode_both_framings() {
        let mut codec = FrameCodec::new();
        let mut dst = BytesMut::new();
        codec
            .encode(
                Outbound {
                    framing: Framing::Line,
                    payload: b"{}".to_vec(),
                },
                &mut dst,
            )
            .unwrap();
        codec
            .encode(
                Outbound {
                    framing: Framing::ContentLength,
                    payload: b"{}".to_vec(),
                },
                &mut dst,
            )
            .unwrap();
        assert_eq!(&dst[..], b"{}\nContent-Length: 2\r\n\r\n{}");
    }

    fn create_server() -> McpServer {
        let registry = default_registry(
            Arc::new(MockBackend::new()),
            Arc::new(HtmlExtractor),
            &EngineConfig::default(),
        );
        McpServer::new(
            registry,
            ServerInfo {
                name: "test".to_string(),
                version: "0.0.0".to_string(),
            },
            Duration::from_secs(5),
        )
    }

    async fn run(input: &[u8]) -> Vec<u8> {
        let server = create_server();
        let (mut client, server_side) = tokio::io::duplex(64 * 1024);
        let (reader, writer) = tokio::io::split(server_side);

        let input = input.to_vec();
        let feeder = tokio::spawn(async move {
            let mut output = Vec::new();
            tokio::io::AsyncWriteExt::write_all(&mut client, &input).await.unwrap();
            tokio::io::AsyncWriteExt::shutdown(&mut client).await.unwrap();
            client.read_to_end(&mut output).await.unwrap();
            output
        });

        serve(&server, reader, writer).await.unwrap();
        feeder.await.unwrap()
    }

    #[tokio::test]
    async fn test_replies_in_order_and_skip_notifications() {
        let input = concat!(
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"initialize\"}\n",
            "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/list\"}\n",
            "garbage\n",
            "{\"jsonrpc\":\"2.0\",\"id\":3,\"method\":\"ping\"}\n",
        );
        let output = String::from_utf8(run(input.as_bytes()).await).unwrap();
        let replies: Vec<Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(replies.len(), 4);
        assert_eq!(replies[0]["id"], 1);
        assert_eq!(replies[1]["id"], 2);
        assert_eq!(replies[1]["result"]["tools"].as_array().unwrap().len(), 4);
        assert_eq!(replies[2]["id"], Value::Null);
        assert_eq!(replies[2]["error"]["code"], -32700);
        assert_eq!(replies[3]["id"], 3);
    }

    #[tokio::test]
    async fn test_content_length_reply_framing() {
        let body = "{\"jsonrpc\":\"2.0\",\"id\":9,\"method\":\"ping\"}";
        let input = format!("Content-Length: {}\r\n\r\n{}", body.len(), body);
        let output = String::from_utf8(run(input.as_bytes()).await).unwrap();

        let expected = "{\"jsonrpc\":\"2.0\",\"id\":9,\"result\":{}}";
        assert_eq!(
            output,
            format!("Content-Length: {}\r\n\r\n{}", expected.len(), expected)
        );
    }

    #[tokio::test]
    async fn test_empty_input_ends_cleanly() {
        assert!(run(b"").await.is_empty());
    }
}
