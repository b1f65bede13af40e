//! gRPC façade over [`crate::convert::convert`].
//!
//! The service holds nothing but the shared configuration. Each call is
//! translated into a [`ConversionRequest`], run through the pipeline inside
//! its own tracing span, and the outcome translated back:
//!
//! | Pipeline outcome            | gRPC status          |
//! |-----------------------------|----------------------|
//! | `Ok(ConversionResult)`      | `OK` + response      |
//! | `FailureKind::InvalidArgument` | `INVALID_ARGUMENT` |
//! | `FailureKind::Internal`     | `INTERNAL`           |
//! | `FailureKind::DeadlineExceeded` | `DEADLINE_EXCEEDED` |
//!
//! When tonic drops the handler future (client cancelled, `grpc-timeout`
//! elapsed) the pipeline's workspace guard and `kill_on_drop` child clean up.

use crate::config::ConverterConfig;
use crate::convert::convert;
use crate::error::{ConverterError, FailureKind};
use crate::model::ConversionRequest;
use crate::proto::converter_server::{Converter, ConverterServer};
use crate::proto::{ConvertRequest, ConvertResponse};
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::Instrument;

/// Default cap on request and response message size: 64 MiB.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 64 * 1024 * 1024;

/// The `converter.v1.Converter` service.
#[derive(Debug, Clone)]
pub struct ConverterService {
    config: Arc<ConverterConfig>,
}

impl ConverterService {
    pub fn new(config: Arc<ConverterConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Wrap the service for registration with a tonic server.
    ///
    /// tonic's 4 MiB default is too small for office documents, so both
    /// directions are raised to `max_message_bytes`.
    pub fn into_server(self, max_message_bytes: usize) -> ConverterServer<Self> {
        ConverterServer::new(self)
            .max_decoding_message_size(max_message_bytes)
            .max_encoding_message_size(max_message_bytes)
    }
}

#[tonic::async_trait]
impl Converter for ConverterService {
    async fn convert(
        &self,
        request: Request<ConvertRequest>,
    ) -> Result<Response<ConvertResponse>, Status> {
        let remote = request.remote_addr();
        let req = request.into_inner();
        let span = tracing::info_span!(
            "convert",
            remote = ?remote,
            from_format = req.from_format,
            to_format = req.to_format,
            input_size = req.content.len(),
        );

        let request = ConversionRequest::from_raw(req.from_format, req.to_format, req.content);
        let result = convert(request, &self.config)
            .instrument(span)
            .await
            .map_err(Status::from)?;

        Ok(Response::new(ConvertResponse {
            to_format: result.to_format as i32,
            content: result.content,
        }))
    }
}

impl From<ConverterError> for Status {
    fn from(err: ConverterError) -> Self {
        let message = match err.raw_output() {
            Some(output) => format!("{}\n{}", err, output),
            None => err.to_string(),
        };
        match err.kind() {
            FailureKind::InvalidArgument => Status::invalid_argument(message),
            FailureKind::Internal => Status::internal(message),
            FailureKind::DeadlineExceeded => Status::deadline_exceeded(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::Format;
    use tonic::Code;

    fn service_in(root: &std::path::Path) -> ConverterService {
        let config = ConverterConfig::builder()
            .pandoc_path(root.join("no-such-pandoc"))
            .scratch_root(root)
            .build()
            .unwrap();
        ConverterService::new(Arc::new(config))
    }

    #[test]
    fn status_codes_follow_failure_kind() {
        let status = Status::from(ConverterError::EmptyContent);
        assert_eq!(status.code(), Code::InvalidArgument);
        assert_eq!(status.message(), "empty input content");

        let status = Status::from(ConverterError::Timeout { elapsed_ms: 10 });
        assert_eq!(status.code(), Code::DeadlineExceeded);

        let status = Status::from(ConverterError::Internal("boom".into()));
        assert_eq!(status.code(), Code::Internal);
    }

    #[test]
    fn conversion_failure_status_carries_diagnostics() {
        let status = Status::from(ConverterError::ConversionFailed {
            status: "exit status: 21".into(),
            output: "Unknown reader: foo\n".into(),
        });
        assert_eq!(status.code(), Code::Internal);
        assert_eq!(
            status.message(),
            "conversion failed - exit status: 21\nUnknown reader: foo\n"
        );
    }

    #[tokio::test]
    async fn unregistered_from_format_is_invalid_argument() {
        let root = tempfile::tempdir().unwrap();
        let service = service_in(root.path());

        let status = service
            .convert(Request::new(ConvertRequest {
                from_format: Format::Unspecified as i32,
                to_format: Format::Html5 as i32,
                content: b"# Title".to_vec(),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
        assert!(status.message().contains("invalid from format"), "got: {}", status.message());
    }

    #[tokio::test]
    async fn empty_content_is_invalid_argument() {
        let root = tempfile::tempdir().unwrap();
        let service = service_in(root.path());

        let status = service
            .convert(Request::new(ConvertRequest {
                from_format: Format::Markdown as i32,
                to_format: Format::Docx as i32,
                content: Vec::new(),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
        assert_eq!(status.message(), "empty input content");
    }

    #[tokio::test]
    async fn missing_converter_is_internal() {
        let root = tempfile::tempdir().unwrap();
        let service = service_in(root.path());

        let status = service
            .convert(Request::new(ConvertRequest {
                from_format: Format::Markdown as i32,
                to_format: Format::Html5 as i32,
                content: b"# Title".to_vec(),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::Internal);
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
