// SPDX-License-Identifier: GPL-3.0-only

//! Capture session management
//!
//! A [`CaptureSession`] ties one camera input to one metadata output:
//!
//! ```text
//! camera thread ──► FrameOutputs ──► preview channel ────────────► screen
//!                        │
//!                        └─────────► recognition channel
//!                                        │  (sampled every interval)
//!                                        ▼
//!                                   SymbolRecognizer ──► metadata channel ──► screen
//! ```
//!
//! Setup happens once per screen and is not retried.

use crate::app::frame_processor::tasks::{self, SymbolRecognizer};
use crate::app::frame_processor::{DetectedSymbol, RecognizerChain, SupportedCodeTypes};
use crate::backends::camera::types::{
    CameraDevice, CameraDeviceType, CameraFormat, CameraPosition, FrameOutputs, FrameReceiver,
};
use crate::backends::camera::{CameraBackend, CaptureStream, select_format};
use crate::config::Config;
use crate::constants::channels;
use crate::errors::CameraError;
use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

/// Receiver for per-frame detection lists
pub type MetadataReceiver = mpsc::Receiver<Vec<DetectedSymbol>>;

/// Finds cameras of the requested physical types and position
#[derive(Debug, Clone)]
pub struct DiscoverySession {
    device_types: Vec<CameraDeviceType>,
    /// `None` matches any position
    position: Option<CameraPosition>,
}

impl DiscoverySession {
    pub fn new(device_types: Vec<CameraDeviceType>, position: Option<CameraPosition>) -> Self {
        Self {
            device_types,
            position,
        }
    }

    /// Matching devices, in backend enumeration order
    pub fn devices(&self, backend: &dyn CameraBackend) -> Vec<CameraDevice> {
        let devices: Vec<CameraDevice> = backend
            .enumerate_cameras()
            .into_iter()
            .filter(|d| self.device_types.contains(&d.device_type))
            .filter(|d| self.position.is_none_or(|p| d.position == p))
            .collect();

        for device in &devices {
            debug!(
                name = %device.name,
                path = %device.path,
                position = ?device.position,
                device_type = ?device.device_type,
                "Discovered camera"
            );
        }

        devices
    }
}

/// A camera bound as the session's input
pub struct DeviceInput {
    device: CameraDevice,
    stream: Box<dyn CaptureStream>,
}

impl DeviceInput {
    /// Open the device in the format closest to the preferred resolution
    pub fn new(
        backend: &dyn CameraBackend,
        device: CameraDevice,
        preferred_width: u32,
        preferred_height: u32,
    ) -> Result<Self, CameraError> {
        let formats = backend.get_formats(&device);
        let format = select_format(&formats, preferred_width, preferred_height).ok_or_else(|| {
            CameraError::BindingFailed(format!("{} offers no readable format", device.name))
        })?;

        let stream = backend
            .open(&device, &format)
            .map_err(|e| CameraError::BindingFailed(e.to_string()))?;

        info!(device = %device.name, format = %stream.format(), "Bound camera input");

        Ok(Self { device, stream })
    }

    pub fn device(&self) -> &CameraDevice {
        &self.device
    }

    pub fn format(&self) -> &CameraFormat {
        self.stream.format()
    }
}

/// Recognizes symbols in sampled frames and reports them to the screen
pub struct MetadataOutput {
    recognizer: Arc<dyn SymbolRecognizer>,
    metadata_object_types: Arc<SupportedCodeTypes>,
    interval: Duration,
}

impl MetadataOutput {
    /// An output reporting nothing until types are set
    pub fn new(recognizer: Arc<dyn SymbolRecognizer>, interval: Duration) -> Self {
        Self {
            recognizer,
            metadata_object_types: Arc::new(SupportedCodeTypes::new([])),
            interval,
        }
    }

    pub fn set_metadata_object_types(&mut self, types: SupportedCodeTypes) {
        self.metadata_object_types = Arc::new(types);
    }

    pub fn metadata_object_types(&self) -> &Arc<SupportedCodeTypes> {
        &self.metadata_object_types
    }
}

/// Connects one device input to one metadata output
pub struct CaptureSession {
    runtime: Option<tokio::runtime::Runtime>,
    input: Option<DeviceInput>,
    output: Option<MetadataOutput>,
    preview_rx: Option<FrameReceiver>,
    metadata_rx: Option<MetadataReceiver>,
    metadata_task: Option<tokio::task::JoinHandle<()>>,
    running: bool,
}

impl CaptureSession {
    pub fn new() -> Result<Self, CameraError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("capture-session")
            .enable_all()
            .build()
            .map_err(|e| CameraError::BackendError(format!("Failed to start runtime: {}", e)))?;

        Ok(Self {
            runtime: Some(runtime),
            input: None,
            output: None,
            preview_rx: None,
            metadata_rx: None,
            metadata_task: None,
            running: false,
        })
    }

    pub fn add_input(&mut self, input: DeviceInput) -> Result<(), CameraError> {
        if self.input.is_some() {
            return Err(CameraError::SessionConfiguration(
                "Session already has an input".into(),
            ));
        }
        self.input = Some(input);
        Ok(())
    }

    pub fn add_output(&mut self, output: MetadataOutput) -> Result<(), CameraError> {
        if self.output.is_some() {
            return Err(CameraError::SessionConfiguration(
                "Session already has an output".into(),
            ));
        }
        self.output = Some(output);
        Ok(())
    }

    pub fn input(&self) -> Option<&DeviceInput> {
        self.input.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Start capture and recognition
    pub fn start_running(&mut self) -> Result<(), CameraError> {
        if self.running {
            return Err(CameraError::AlreadyRunning);
        }

        let (Some(input), Some(output), Some(runtime)) =
            (self.input.as_mut(), self.output.as_ref(), self.runtime.as_ref())
        else {
            return Err(CameraError::SessionConfiguration(
                "Session needs an input and an output".into(),
            ));
        };

        let mut outputs = FrameOutputs::new();
        let preview_rx = outputs.add("preview", channels::PREVIEW_CAPACITY);
        let recognition_rx = outputs.add("recognition", channels::RECOGNITION_CAPACITY);
        let (metadata_tx, metadata_rx) = mpsc::channel(channels::METADATA_CAPACITY);

        input.stream.start(outputs)?;

        let task = runtime.spawn(run_metadata_output(
            recognition_rx,
            Arc::clone(&output.recognizer),
            Arc::clone(&output.metadata_object_types),
            output.interval,
            metadata_tx,
        ));

        info!(device = %input.device.name, "Capture session running");

        self.preview_rx = Some(preview_rx);
        self.metadata_rx = Some(metadata_rx);
        self.metadata_task = Some(task);
        self.running = true;
        Ok(())
    }

    /// Stop capture and recognition
    pub fn stop_running(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;

        if let Some(input) = self.input.as_mut()
            && let Err(e) = input.stream.stop()
        {
            warn!(error = %e, "Failed to stop capture stream");
        }
        if let Some(task) = self.metadata_task.take() {
            task.abort();
        }
        info!("Capture session stopped");
    }

    /// Preview frames, available once after `start_running`
    pub fn take_preview_receiver(&mut self) -> Option<FrameReceiver> {
        self.preview_rx.take()
    }

    /// Detection lists, available once after `start_running`
    pub fn take_metadata_receiver(&mut self) -> Option<MetadataReceiver> {
        self.metadata_rx.take()
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop_running();
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// Sample frames and push one detection list per processed frame
///
/// Ends when the camera stops or the screen drops its receiver.
async fn run_metadata_output(
    mut frames: FrameReceiver,
    recognizer: Arc<dyn SymbolRecognizer>,
    types: Arc<SupportedCodeTypes>,
    interval: Duration,
    mut sink: mpsc::Sender<Vec<DetectedSymbol>>,
) {
    let mut last_processed: Option<Instant> = None;

    while let Some(frame) = frames.next().await {
        if let Some(last) = last_processed
            && last.elapsed() < interval
        {
            continue;
        }
        last_processed = Some(Instant::now());

        let symbols = tasks::recognize(Arc::clone(&recognizer), frame, Arc::clone(&types)).await;
        trace!(count = symbols.len(), "Frame processed");

        if sink.send(symbols).await.is_err() {
            debug!("Metadata receiver dropped");
            break;
        }
    }

    debug!(recognizer = recognizer.name(), "Metadata output finished");
}

/// Discover, bind and start a capture session
///
/// Every failure is final; the caller reports it and leaves the screen
/// without a camera.
pub fn configure_session(
    config: &Config,
    backend: Arc<dyn CameraBackend>,
) -> Result<CaptureSession, CameraError> {
    if !backend.is_available() {
        error!(backend = ?backend.backend_type(), "Camera backend not available");
        return Err(CameraError::NoCameraFound);
    }

    let discovery = DiscoverySession::new(config.device_types.clone(), config.camera_position);
    let Some(device) = discovery.devices(backend.as_ref()).into_iter().next() else {
        error!(
            backend = ?backend.backend_type(),
            device_types = ?config.device_types,
            position = ?config.camera_position,
            "Failed to get device"
        );
        return Err(CameraError::NoCameraFound);
    };

    let input = DeviceInput::new(
        backend.as_ref(),
        device,
        config.preferred_width,
        config.preferred_height,
    )
    .inspect_err(|e| error!(error = %e, "Failed to bind camera"))?;

    let recognizer: Arc<dyn SymbolRecognizer> =
        Arc::new(RecognizerChain::standard(config.max_detection_dimension));
    let mut output = MetadataOutput::new(recognizer, config.detection_interval());
    output.set_metadata_object_types(config.supported_types.clone());

    let mut session = CaptureSession::new()?;
    session.add_input(input)?;
    session.add_output(output)?;
    session.start_running()?;

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::{
        BackendError, BackendResult, CameraBackendType, CameraFrame, Framerate,
    };

    /// Camera that delivers a fixed number of blank frames when started
    struct FakeBackend {
        devices: Vec<CameraDevice>,
        available: bool,
        fail_open: bool,
        frames: usize,
    }

    struct FakeStream {
        format: CameraFormat,
        frames: usize,
        running: bool,
    }

    impl CaptureStream for FakeStream {
        fn start(&mut self, mut outputs: FrameOutputs) -> BackendResult<()> {
            if self.running {
                return Err(BackendError::AlreadyStreaming);
            }
            for _ in 0..self.frames {
                let frame = CameraFrame::from_rgba(
                    self.format.width,
                    self.format.height,
                    vec![255; (self.format.width * self.format.height * 4) as usize],
                );
                outputs.dispatch(&frame);
            }
            self.running = true;
            Ok(())
        }

        fn stop(&mut self) -> BackendResult<()> {
            self.running = false;
            Ok(())
        }

        fn is_running(&self) -> bool {
            self.running
        }

        fn format(&self) -> &CameraFormat {
            &self.format
        }
    }

    impl CameraBackend for FakeBackend {
        fn backend_type(&self) -> CameraBackendType {
            CameraBackendType::StillImage
        }

        fn is_available(&self) -> bool {
            self.available
        }

        fn enumerate_cameras(&self) -> Vec<CameraDevice> {
            self.devices.clone()
        }

        fn get_formats(&self, _device: &CameraDevice) -> Vec<CameraFormat> {
            vec![CameraFormat {
                width: 32,
                height: 24,
                framerate: Some(Framerate::from_int(30)),
                pixel_format: "RGBA".into(),
            }]
        }

        fn open(
            &self,
            _device: &CameraDevice,
            format: &CameraFormat,
        ) -> BackendResult<Box<dyn CaptureStream>> {
            if self.fail_open {
                return Err(BackendError::DeviceNotFound("busy".into()));
            }
            Ok(Box::new(FakeStream {
                format: format.clone(),
                frames: self.frames,
                running: false,
            }))
        }
    }

    fn device(name: &str, position: CameraPosition, device_type: CameraDeviceType) -> CameraDevice {
        CameraDevice {
            name: name.into(),
            path: format!("/dev/{}", name),
            position,
            device_type,
            device_info: None,
        }
    }

    fn backend(devices: Vec<CameraDevice>) -> Arc<dyn CameraBackend> {
        Arc::new(FakeBackend {
            devices,
            available: true,
            fail_open: false,
            frames: 1,
        })
    }

    #[test]
    fn test_discovery_filters_type_and_position() {
        let backend = backend(vec![
            device("front", CameraPosition::Front, CameraDeviceType::WideAngle),
            device("ir", CameraPosition::Back, CameraDeviceType::Infrared),
            device("back", CameraPosition::Back, CameraDeviceType::WideAngle),
        ]);

        let discovery =
            DiscoverySession::new(vec![CameraDeviceType::WideAngle], Some(CameraPosition::Back));
        let names: Vec<_> = discovery
            .devices(backend.as_ref())
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["back"]);

        let any = DiscoverySession::new(vec![CameraDeviceType::WideAngle], None);
        assert_eq!(any.devices(backend.as_ref()).len(), 2);
    }

    #[test]
    fn test_no_camera_found() {
        let backend = backend(vec![device(
            "front",
            CameraPosition::Front,
            CameraDeviceType::WideAngle,
        )]);
        let result = configure_session(&Config::default(), backend);
        assert!(matches!(result, Err(CameraError::NoCameraFound)));
    }

    #[test]
    fn test_unavailable_backend_has_no_camera() {
        let backend: Arc<dyn CameraBackend> = Arc::new(FakeBackend {
            devices: vec![device("back", CameraPosition::Back, CameraDeviceType::WideAngle)],
            available: false,
            fail_open: false,
            frames: 1,
        });
        let result = configure_session(&Config::default(), backend);
        assert!(matches!(result, Err(CameraError::NoCameraFound)));
    }

    #[test]
    fn test_binding_failure() {
        let backend: Arc<dyn CameraBackend> = Arc::new(FakeBackend {
            devices: vec![device("back", CameraPosition::Back, CameraDeviceType::WideAngle)],
            available: true,
            fail_open: true,
            frames: 0,
        });
        let result = configure_session(&Config::default(), backend);
        assert!(matches!(result, Err(CameraError::BindingFailed(_))));
    }

    #[test]
    fn test_session_rejects_second_input_and_output() {
        let backend = backend(vec![device(
            "back",
            CameraPosition::Back,
            CameraDeviceType::WideAngle,
        )]);
        let dev = backend.enumerate_cameras().remove(0);
        let mut session = CaptureSession::new().unwrap();
        session
            .add_input(DeviceInput::new(backend.as_ref(), dev.clone(), 640, 480).unwrap())
            .unwrap();
        let second = DeviceInput::new(backend.as_ref(), dev, 640, 480).unwrap();
        assert!(matches!(
            session.add_input(second),
            Err(CameraError::SessionConfiguration(_))
        ));

        let recognizer: Arc<dyn SymbolRecognizer> = Arc::new(RecognizerChain::standard(640));
        session
            .add_output(MetadataOutput::new(Arc::clone(&recognizer), Duration::ZERO))
            .unwrap();
        assert!(matches!(
            session.add_output(MetadataOutput::new(recognizer, Duration::ZERO)),
            Err(CameraError::SessionConfiguration(_))
        ));
    }

    #[test]
    fn test_start_requires_input_and_output() {
        let mut session = CaptureSession::new().unwrap();
        assert!(matches!(
            session.start_running(),
            Err(CameraError::SessionConfiguration(_))
        ));
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let backend = backend(vec![device(
            "back",
            CameraPosition::Back,
            CameraDeviceType::WideAngle,
        )]);
        let mut session = configure_session(&Config::default(), backend).unwrap();
        assert!(session.is_running());
        assert!(matches!(
            session.start_running(),
            Err(CameraError::AlreadyRunning)
        ));
        session.stop_running();
        assert!(!session.is_running());
    }

    #[test]
    fn test_running_session_delivers_frames_and_detections() {
        let backend = backend(vec![device(
            "back",
            CameraPosition::Back,
            CameraDeviceType::WideAngle,
        )]);
        let mut session = configure_session(&Config::default(), backend).unwrap();
        assert_eq!(session.input().unwrap().format().width, 32);

        let mut preview = session.take_preview_receiver().unwrap();
        let frame = preview.try_recv().unwrap();
        assert_eq!(frame.width, 32);

        // A blank frame still produces a (empty) detection list
        let mut metadata = session.take_metadata_receiver().unwrap();
        let symbols = futures::executor::block_on(metadata.next()).unwrap();
        assert!(symbols.is_empty());

        assert!(session.take_preview_receiver().is_none());
    }
}
