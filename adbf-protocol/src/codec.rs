//! Text frame codec
//!
//! WebSocket transports hand over one text frame at a time, so
//! [`decode_event`] and [`encode_command`] work on single frames.
//! [`ClientCodec`] adds newline framing on top for byte streams such as
//! recorded `.jsonl` event logs.

use bytes::{Buf, BufMut, BytesMut};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio_util::codec::{Decoder, Encoder};

use crate::messages::{ClientCommand, ServerEvent};

/// Maximum accepted frame size (1 MB)
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Protocol codec error
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Frame is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Frame is not a JSON object")]
    NotAnObject,

    #[error("Frame has no string 'event' tag")]
    MissingTag,

    #[error("Invalid payload for '{tag}': {source}")]
    InvalidPayload {
        tag: String,
        source: serde_json::Error,
    },

    #[error("Frame too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },
}

/// Decode a single text frame into a typed event
///
/// Unrecognized tags are not an error; they come back as
/// [`ServerEvent::Unknown`] with the raw `data` value.
pub fn decode_event(text: &str) -> Result<ServerEvent, CodecError> {
    if text.len() > MAX_FRAME_SIZE {
        return Err(CodecError::MessageTooLarge {
            size: text.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    let Value::Object(mut frame) = serde_json::from_str::<Value>(text)? else {
        return Err(CodecError::NotAnObject);
    };

    let tag = match frame.remove("event") {
        Some(Value::String(tag)) => tag,
        _ => return Err(CodecError::MissingTag),
    };
    let payload = frame.remove("data").unwrap_or(Value::Null);

    let event = match tag.as_str() {
        "init_paths" => ServerEvent::InitPaths(payload_as(&tag, payload)?),
        "rest_dirs" => ServerEvent::RestDirs(payload_as(&tag, payload)?),
        "start" | "init" => ServerEvent::Start(payload_as(&tag, payload)?),
        "searching" => ServerEvent::Searching(payload_as(&tag, payload)?),
        "refresh" => ServerEvent::Refresh(payload_as(&tag, payload)?),
        "update" => ServerEvent::Update(payload_as(&tag, payload)?),
        "nothing" => ServerEvent::Nothing,
        _ => ServerEvent::Unknown { tag, payload },
    };
    Ok(event)
}

fn payload_as<T: DeserializeOwned>(tag: &str, payload: Value) -> Result<T, CodecError> {
    serde_json::from_value(payload).map_err(|source| CodecError::InvalidPayload {
        tag: tag.to_string(),
        source,
    })
}

/// Encode a command as a single text frame
pub fn encode_command(command: &ClientCommand) -> String {
    let frame = match command {
        ClientCommand::Ready => json!({ "event": "ready" }),
        ClientCommand::RestDir(request) => json!({
            "event": "rest_dir",
            "data": { "nr": request.nr, "dir": request.dir },
        }),
        ClientCommand::Start(dirs) => json!({ "event": "start", "data": dirs }),
    };
    frame.to_string()
}

/// Newline framed codec for the client side
///
/// Decodes [`ServerEvent`]s and encodes [`ClientCommand`]s, one JSON frame
/// per line. A line that fails to decode is yielded as an `Err` item rather
/// than a stream error, so one bad frame does not end the stream. Lines
/// over [`MAX_FRAME_SIZE`] are skipped up to their newline and reported as
/// [`CodecError::MessageTooLarge`] items.
#[derive(Debug, Default)]
pub struct ClientCodec {
    /// Bytes already scanned for a newline
    next_index: usize,
    /// Length dropped so far of an oversized line being skipped
    discarding: Option<usize>,
}

impl ClientCodec {
    pub fn new() -> Self {
        Self {
            next_index: 0,
            discarding: None,
        }
    }
}

fn too_large(size: usize) -> CodecError {
    CodecError::MessageTooLarge {
        size,
        max: MAX_FRAME_SIZE,
    }
}

impl Decoder for ClientCodec {
    type Item = Result<ServerEvent, CodecError>;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if let Some(dropped) = self.discarding {
                let Some(offset) = src.iter().position(|b| *b == b'\n') else {
                    self.discarding = Some(dropped + src.len());
                    src.clear();
                    return Ok(None);
                };
                src.advance(offset + 1);
                self.discarding = None;
                return Ok(Some(Err(too_large(dropped + offset))));
            }

            let newline = src[self.next_index..].iter().position(|b| *b == b'\n');

            let Some(offset) = newline else {
                if src.len() > MAX_FRAME_SIZE {
                    // No newline anywhere in the buffer, so all of it belongs to this line
                    self.discarding = Some(src.len());
                    self.next_index = 0;
                    src.clear();
                    return Ok(None);
                }
                self.next_index = src.len();
                return Ok(None);
            };

            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            let line = trim_line_ending(&line);
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let item = std::str::from_utf8(line)
                .map_err(CodecError::from)
                .and_then(decode_event);
            return Ok(Some(item));
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(item) = self.decode(src)? {
            return Ok(Some(item));
        }
        if let Some(dropped) = self.discarding.take() {
            src.clear();
            return Ok(Some(Err(too_large(dropped))));
        }
        if src.is_empty() || src.iter().all(u8::is_ascii_whitespace) {
            src.clear();
            self.next_index = 0;
            return Ok(None);
        }

        // Last line without a trailing newline
        let line = src.split();
        self.next_index = 0;
        let item = std::str::from_utf8(trim_line_ending(&line))
            .map_err(CodecError::from)
            .and_then(decode_event);
        Ok(Some(item))
    }
}

impl Encoder<ClientCommand> for ClientCodec {
    type Error = CodecError;

    fn encode(&mut self, item: ClientCommand, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let text = encode_command(&item);
        dst.reserve(text.len() + 1);
        dst.put_slice(text.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && matches!(line[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    &line[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::*;
    use futures::StreamExt;
    use serde_json::json;
    use tokio_util::codec::FramedRead;

    #[test]
    fn test_decode_init_paths() {
        let event = decode_event(r#"{"event":"init_paths","data":["/home/user"]}"#).unwrap();
        assert_eq!(event, ServerEvent::InitPaths(vec!["/home/user".into()]));
    }

    #[test]
    fn test_decode_rest_dirs() {
        let event = decode_event(
            r#"{"event":"rest_dirs","data":{"nr":0,"dirs":["/home/user/..","/home/user/music"]}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            ServerEvent::RestDirs(DirListing {
                nr: 0,
                dirs: vec!["/home/user/..".into(), "/home/user/music".into()],
            })
        );
    }

    #[test]
    fn test_decode_start_and_legacy_init() {
        let text = r#"{"event":"start","data":{"paths":[{"nr":3,"name":"/music"}]}}"#;
        let legacy = text.replace("\"start\"", "\"init\"");
        let expected = ServerEvent::Start(ScanPathList {
            paths: vec![PathEntry {
                nr: 3,
                name: "/music".into(),
            }],
        });
        assert_eq!(decode_event(text).unwrap(), expected);
        assert_eq!(decode_event(&legacy).unwrap(), expected);
    }

    #[test]
    fn test_decode_searching_net() {
        let event = decode_event(r#"{"event":"searching","data":[{"type":"net"},false]}"#).unwrap();
        assert_eq!(
            event,
            ServerEvent::Searching(ActivityUpdate(ActivityTarget::Net, false))
        );
    }

    #[test]
    fn test_decode_refresh_path() {
        let event =
            decode_event(r#"{"event":"refresh","data":{"type":"path","cnt":{"nr":5}}}"#).unwrap();
        assert_eq!(event, ServerEvent::Refresh(ActivityTarget::Path { nr: 5 }));
    }

    #[test]
    fn test_decode_update_add() {
        let event = decode_event(
            r#"{"event":"update","data":{"view":"add","cnt":{"id":"peer1","addr":["1.2.3.4"]}}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            ServerEvent::Update(NetUpdate::Add(PeerAnnouncement {
                id: "peer1".into(),
                addr: vec!["1.2.3.4".into()],
            }))
        );
    }

    #[test]
    fn test_decode_update_finished() {
        let event = decode_event(
            r#"{"event":"update","data":{"view":"finished","cnt":{"peer":"ab12","data":{"nr_searched_files":10,"nr_found_songs":7,"nr_internal_duplicates":1,"size_of_data_in_kb":64}}}}"#,
        )
        .unwrap();
        let ServerEvent::Update(NetUpdate::Finished(result)) = event else {
            panic!("expected finished update");
        };
        assert_eq!(result.peer, "ab12");
        assert_eq!(result.data.found_audio_files, 7);
    }

    #[test]
    fn test_decode_nothing_with_or_without_data() {
        assert_eq!(
            decode_event(r#"{"event":"nothing"}"#).unwrap(),
            ServerEvent::Nothing
        );
        assert_eq!(
            decode_event(r#"{"event":"nothing","data":[]}"#).unwrap(),
            ServerEvent::Nothing
        );
    }

    #[test]
    fn test_decode_unknown_tag() {
        let event = decode_event(r#"{"event":"stats","data":{"line":3,"max":9}}"#).unwrap();
        assert_eq!(
            event,
            ServerEvent::Unknown {
                tag: "stats".into(),
                payload: json!({"line": 3, "max": 9}),
            }
        );
    }

    #[test]
    fn test_decode_unknown_tag_without_data() {
        let event = decode_event(r#"{"event":"ping"}"#).unwrap();
        assert_eq!(
            event,
            ServerEvent::Unknown {
                tag: "ping".into(),
                payload: Value::Null,
            }
        );
    }

    #[test]
    fn test_decode_not_json() {
        assert!(matches!(decode_event("hello"), Err(CodecError::Json(_))));
    }

    #[test]
    fn test_decode_not_an_object() {
        assert!(matches!(decode_event("[1,2]"), Err(CodecError::NotAnObject)));
    }

    #[test]
    fn test_decode_missing_tag() {
        assert!(matches!(
            decode_event(r#"{"data":[]}"#),
            Err(CodecError::MissingTag)
        ));
        assert!(matches!(
            decode_event(r#"{"event":7}"#),
            Err(CodecError::MissingTag)
        ));
    }

    #[test]
    fn test_decode_bad_payload_for_known_tag() {
        let result = decode_event(r#"{"event":"rest_dirs","data":{"nr":"zero"}}"#);
        match result {
            Err(CodecError::InvalidPayload { tag, .. }) => assert_eq!(tag, "rest_dirs"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_decode_too_large() {
        let text = format!(r#"{{"event":"nothing","data":"{}"}}"#, "x".repeat(MAX_FRAME_SIZE));
        assert!(matches!(
            decode_event(&text),
            Err(CodecError::MessageTooLarge { .. })
        ));
    }

    #[test]
    fn test_encode_matches_serde_shape() {
        let commands = vec![
            ClientCommand::Ready,
            ClientCommand::RestDir(DirRequest {
                nr: 1,
                dir: "/home/user".into(),
            }),
            ClientCommand::Start(vec!["/home/user".into(), String::new()]),
        ];
        for command in commands {
            let text = encode_command(&command);
            let parsed: ClientCommand = serde_json::from_str(&text).unwrap();
            assert_eq!(parsed, command);
        }
    }

    #[test]
    fn test_codec_splits_lines() {
        let mut codec = ClientCodec::new();
        let mut buf = BytesMut::from(
            "{\"event\":\"nothing\"}\r\n\n{\"event\":\"init_paths\",\"data\":[]}\n".as_bytes(),
        );

        let first = codec.decode(&mut buf).unwrap().unwrap().unwrap();
        assert_eq!(first, ServerEvent::Nothing);

        let second = codec.decode(&mut buf).unwrap().unwrap().unwrap();
        assert_eq!(second, ServerEvent::InitPaths(vec![]));

        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_codec_partial_line() {
        let mut codec = ClientCodec::new();
        let mut buf = BytesMut::from("{\"event\":\"not".as_bytes());
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"hing\"}\n");
        let event = codec.decode(&mut buf).unwrap().unwrap().unwrap();
        assert_eq!(event, ServerEvent::Nothing);
    }

    #[test]
    fn test_codec_bad_line_is_item_error() {
        let mut codec = ClientCodec::new();
        let mut buf = BytesMut::from("garbage\n{\"event\":\"nothing\"}\n".as_bytes());

        let bad = codec.decode(&mut buf).unwrap().unwrap();
        assert!(bad.is_err());

        let good = codec.decode(&mut buf).unwrap().unwrap().unwrap();
        assert_eq!(good, ServerEvent::Nothing);
    }

    #[test]
    fn test_codec_eof_without_newline() {
        let mut codec = ClientCodec::new();
        let mut buf = BytesMut::from("{\"event\":\"nothing\"}".as_bytes());
        let event = codec.decode_eof(&mut buf).unwrap().unwrap().unwrap();
        assert_eq!(event, ServerEvent::Nothing);
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_codec_line_too_large() {
        let mut codec = ClientCodec::new();
        let mut buf = BytesMut::from(vec![b'x'; MAX_FRAME_SIZE + 1].as_slice());
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert!(buf.is_empty());

        buf.extend_from_slice(b"xx\n{\"event\":\"nothing\"}\n");
        match codec.decode(&mut buf).unwrap() {
            Some(Err(CodecError::MessageTooLarge { size, max })) => {
                assert_eq!(size, MAX_FRAME_SIZE + 3);
                assert_eq!(max, MAX_FRAME_SIZE);
            }
            other => panic!("unexpected item: {:?}", other),
        }

        let next = codec.decode(&mut buf).unwrap().unwrap().unwrap();
        assert_eq!(next, ServerEvent::Nothing);
    }

    #[test]
    fn test_codec_oversized_last_line() {
        let mut codec = ClientCodec::new();
        let mut buf = BytesMut::from(vec![b'x'; MAX_FRAME_SIZE + 1].as_slice());
        assert!(matches!(
            codec.decode_eof(&mut buf).unwrap(),
            Some(Err(CodecError::MessageTooLarge { .. }))
        ));
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_framed_read_skips_oversized_line() {
        use tokio::io::AsyncWriteExt;

        let (mut writer, reader) = tokio::io::duplex(8 * 1024);
        let big = format!(
            "{{\"event\":\"nothing\",\"data\":\"{}\"}}\n",
            "x".repeat(2 * MAX_FRAME_SIZE)
        );
        let feeder = tokio::spawn(async move {
            writer.write_all(big.as_bytes()).await.unwrap();
            writer
                .write_all(b"{\"event\":\"init_paths\",\"data\":[\"/srv\"]}\n")
                .await
                .unwrap();
        });

        let mut frames = FramedRead::new(reader, ClientCodec::new());
        let first = frames.next().await.unwrap().unwrap();
        assert!(matches!(first, Err(CodecError::MessageTooLarge { .. })));

        let second = frames.next().await.unwrap().unwrap().unwrap();
        assert_eq!(second, ServerEvent::InitPaths(vec!["/srv".into()]));

        feeder.await.unwrap();
        assert!(frames.next().await.is_none());
    }

    #[test]
    fn test_codec_encode_appends_newline() {
        let mut codec = ClientCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(ClientCommand::Ready, &mut buf).unwrap();
        assert_eq!(&buf[..], b"{\"event\":\"ready\"}\n");
    }

    #[tokio::test]
    async fn test_framed_read_over_log() {
        let log: &[u8] = b"{\"event\":\"init_paths\",\"data\":[\"/a\"]}\nnot json\n{\"event\":\"update\",\"data\":{\"view\":\"remove\",\"cnt\":\"p\"}}\n";
        let mut frames = FramedRead::new(log, ClientCodec::new());

        let mut ok = 0;
        let mut bad = 0;
        while let Some(item) = frames.next().await {
            match item.unwrap() {
                Ok(_) => ok += 1,
                Err(_) => bad += 1,
            }
        }
        assert_eq!(ok, 2);
        assert_eq!(bad, 1);
    }
}
