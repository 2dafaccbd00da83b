pub mod protocol;
pub use protocol::*;

use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use serialport::SerialPort;
use tracing::{debug, info};

use crate::auv::scheduler::ActuatorDriver;
use crate::auv::thrust_mixer::{VerticalPwm, VoithPwm};
use crate::config::LinkSettings;
use crate::error::{LinkError, SensorError};
use crate::sensors::{SensorFrame, SensorSource};

//serial connection to the vehicle microcontroller, split into a receive
//half (sensor source) and a transmit half (actuator driver) over one port
pub struct SerialLink;

impl SerialLink{
    pub fn open(settings: &LinkSettings) -> Result<(LinkReader, LinkWriter), LinkError>{
        info!(port = %settings.port, baud = settings.baud, "opening serial link");
        let port = serialport::new(&settings.port, settings.baud)
            .timeout(Duration::from_millis(settings.timeout_ms))
            .open()?;
        let tx = port.try_clone()?;
        info!(port = %settings.port, "serial link connected");

        let reader = LinkReader::new(port).with_battery_timeout(settings.battery_timeout());
        Ok((reader, LinkWriter::new(tx)))
    }
}

const DEFAULT_BATTERY_TIMEOUT: Duration = Duration::from_secs(1);

//decodes incoming frames into sensor readings
pub struct LinkReader<R: Read + Send = Box<dyn SerialPort>>{
    port: R,
    decoder: FrameDecoder,
    attitude: Option<AttitudeMsg>,
    depth: Option<f32>,
    battery: Option<(Instant, f32)>,
    battery_timeout: Duration,
}

impl<R: Read + Send> LinkReader<R>{
    pub fn new(port: R) -> Self{
        LinkReader{
            port,
            decoder: FrameDecoder::new(),
            attitude: None,
            depth: None,
            battery: None,
            battery_timeout: DEFAULT_BATTERY_TIMEOUT,
        }
    }

    //battery reports older than this no longer count
    pub fn with_battery_timeout(mut self, timeout: Duration) -> Self{
        self.battery_timeout = timeout;
        self
    }

    fn battery_at(&self, now: Instant) -> Option<f32>{
        let (at, volts) = self.battery?;
        (now.saturating_duration_since(at) <= self.battery_timeout).then_some(volts)
    }

    //one time-boxed read; true if a new attitude or depth reading arrived
    fn pump(&mut self) -> Result<bool, LinkError>{
        let mut read_buf = [0u8; 256];
        match self.port.read(&mut read_buf){
            Ok(n) if n > 0 => self.decoder.extend(&read_buf[..n]),
            Ok(_) => return Ok(false),
            Err(ref e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => return Ok(false),
            Err(e) => return Err(e.into()),
        }

        let mut fresh = false;
        while let Some(frame) = self.decoder.next_frame(){
            match frame.msg_type{
                MsgType::Attitude =>{
                    if let Some(msg) = AttitudeMsg::from_bytes(&frame.payload){
                        self.attitude = Some(msg);
                        fresh = true;
                    }
                }
                MsgType::Depth =>{
                    if let Some(depth) = scalar_from_bytes(&frame.payload){
                        self.depth = Some(depth);
                        fresh = true;
                    }
                }
                MsgType::Battery =>{
                    if let Some(volts) = scalar_from_bytes(&frame.payload){
                        self.battery = Some((Instant::now(), volts));
                    }
                }
                other => debug!(?other, "ignoring outbound message type on receive path"),
            }
        }
        Ok(fresh)
    }
}

impl<R: Read + Send> SensorSource for LinkReader<R>{
    fn poll(&mut self) -> Result<Option<SensorFrame>, SensorError>{
        if !self.pump()?{
            return Ok(None);
        }
        //a frame needs both halves before it is usable
        Ok(match (&self.attitude, self.depth){
            (Some(attitude), Some(depth)) => Some(sensor_frame(attitude, depth)),
            _ => None,
        })
    }

    fn battery_voltage(&self) -> Option<f64>{
        self.battery_at(Instant::now()).map(f64::from)
    }
}

//encodes actuator commands onto the wire
pub struct LinkWriter<W: Write + Send = Box<dyn SerialPort>>{
    port: W,
}

impl<W: Write + Send> LinkWriter<W>{
    pub fn new(port: W) -> Self{
        LinkWriter{ port }
    }

    pub fn into_inner(self) -> W{
        self.port
    }

    pub fn send_frame(&mut self, msg_type: MsgType, payload: &[u8]) -> Result<(), LinkError>{
        let frame = encode_frame(msg_type, payload)?;
        self.port.write_all(&frame)?;
        self.port.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> ActuatorDriver for LinkWriter<W>{
    fn send_vertical(&mut self, pwm: &VerticalPwm) -> Result<(), LinkError>{
        self.send_frame(MsgType::VerticalPwm, &vertical_to_bytes(pwm))
    }

    fn send_voith(&mut self, pwm: &VoithPwm) -> Result<(), LinkError>{
        self.send_frame(MsgType::VoithPwm, &voith_to_bytes(pwm))
    }
}
