use crate::auv::thrust_mixer::{VerticalPwm, VoithPwm};
use crate::error::LinkError;
use crate::sensors::SensorFrame;

pub const SYNC_BYTE: u8 = 0xAA;
pub const MAX_MSG_SIZE: usize = 244;

//payload sizes, all little-endian
pub const ATTITUDE_MSG_SIZE: usize = 24;  //6 * f32
pub const DEPTH_MSG_SIZE: usize = 4;      //1 * f32
pub const BATTERY_MSG_SIZE: usize = 4;    //1 * f32
pub const VERTICAL_PWM_SIZE: usize = 6;   //3 * u16
pub const VOITH_PWM_SIZE: usize = 12;     //6 * u16

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MsgType{
    //microcontroller -> host
    Depth = 0x02,
    Attitude = 0x05,
    Battery = 0x06,
    //host -> microcontroller
    VerticalPwm = 0x03,
    VoithPwm = 0x07,
}

impl MsgType{
    pub fn from_u8(val: u8) -> Option<Self>{
        match val{
            0x02 => Some(MsgType::Depth),
            0x03 => Some(MsgType::VerticalPwm),
            0x05 => Some(MsgType::Attitude),
            0x06 => Some(MsgType::Battery),
            0x07 => Some(MsgType::VoithPwm),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame{
    pub msg_type: MsgType,
    pub payload: Vec<u8>,
}

pub fn checksum(data: &[u8]) -> u8{
    data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

//frame format: [SYNC][TYPE][LEN][PAYLOAD...][CHECKSUM]
//              0xAA  1byte 1byte  LEN bytes   1byte
//checksum covers TYPE, LEN and PAYLOAD
pub fn encode_frame(msg_type: MsgType, payload: &[u8]) -> Result<Vec<u8>, LinkError>{
    if payload.len() > MAX_MSG_SIZE{
        return Err(LinkError::PayloadTooLarge(payload.len()));
    }

    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.push(SYNC_BYTE);
    frame.push(msg_type as u8);
    frame.push(payload.len() as u8);
    frame.extend_from_slice(payload);
    frame.push(checksum(&frame[1..]));
    Ok(frame)
}

//reassembles frames from a byte stream that may be split, noisy or misaligned
#[derive(Debug, Default)]
pub struct FrameDecoder{
    buffer: Vec<u8>,
}

impl FrameDecoder{
    pub fn new() -> Self{
        FrameDecoder{ buffer: Vec::with_capacity(512) }
    }

    pub fn extend(&mut self, bytes: &[u8]){
        self.buffer.extend_from_slice(bytes);
    }

    pub fn buffered(&self) -> usize{
        self.buffer.len()
    }

    //next valid frame, skipping garbage, bad checksums and unknown types
    pub fn next_frame(&mut self) -> Option<Frame>{
        loop{
            let sync_pos = match self.buffer.iter().position(|&b| b == SYNC_BYTE){
                Some(pos) => pos,
                None =>{
                    self.buffer.clear();
                    return None;
                }
            };
            if sync_pos > 0{
                self.buffer.drain(0..sync_pos);
            }

            if self.buffer.len() < 4{
                return None;
            }

            let len = self.buffer[2] as usize;
            if len > MAX_MSG_SIZE{
                self.buffer.remove(0);
                continue;
            }

            let frame_len = 4 + len; //sync + type + len + payload + checksum
            if self.buffer.len() < frame_len{
                return None;
            }

            if self.buffer[3 + len] != checksum(&self.buffer[1..3 + len]){
                //the sync byte was noise; resync from the next one
                self.buffer.remove(0);
                continue;
            }

            let msg_type = MsgType::from_u8(self.buffer[1]);
            let payload = self.buffer[3..3 + len].to_vec();
            self.buffer.drain(0..frame_len);

            if let Some(msg_type) = msg_type{
                return Some(Frame{ msg_type, payload });
            }
        }
    }
}

fn f32_at(data: &[u8], idx: usize) -> f32{
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&data[idx * 4..idx * 4 + 4]);
    f32::from_le_bytes(raw)
}

fn u16_at(data: &[u8], idx: usize) -> u16{
    u16::from_le_bytes([data[idx * 2], data[idx * 2 + 1]])
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AttitudeMsg{
    pub roll: f32,        //degrees
    pub pitch: f32,
    pub yaw: f32,
    pub roll_rate: f32,   //deg/s
    pub pitch_rate: f32,
    pub yaw_rate: f32,
}

impl AttitudeMsg{
    pub fn from_bytes(data: &[u8]) -> Option<Self>{
        if data.len() < ATTITUDE_MSG_SIZE{
            return None;
        }
        Some(AttitudeMsg{
            roll: f32_at(data, 0),
            pitch: f32_at(data, 1),
            yaw: f32_at(data, 2),
            roll_rate: f32_at(data, 3),
            pitch_rate: f32_at(data, 4),
            yaw_rate: f32_at(data, 5),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8>{
        [self.roll, self.pitch, self.yaw, self.roll_rate, self.pitch_rate, self.yaw_rate]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect()
    }
}

//single-float readings: depth in meters, battery in volts
pub fn scalar_from_bytes(data: &[u8]) -> Option<f32>{
    if data.len() < 4{
        return None;
    }
    Some(f32_at(data, 0))
}

pub fn scalar_to_bytes(value: f32) -> Vec<u8>{
    value.to_le_bytes().to_vec()
}

pub fn vertical_to_bytes(pwm: &VerticalPwm) -> Vec<u8>{
    [pwm.left, pwm.right, pwm.tail].iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn vertical_from_bytes(data: &[u8]) -> Option<VerticalPwm>{
    if data.len() < VERTICAL_PWM_SIZE{
        return None;
    }
    Some(VerticalPwm{
        left: u16_at(data, 0),
        right: u16_at(data, 1),
        tail: u16_at(data, 2),
    })
}

pub fn voith_to_bytes(pwm: &VoithPwm) -> Vec<u8>{
    [
        pwm.left_servo1,
        pwm.left_servo2,
        pwm.right_servo1,
        pwm.right_servo2,
        pwm.left_motor,
        pwm.right_motor,
    ]
    .iter()
    .flat_map(|v| v.to_le_bytes())
    .collect()
}

pub fn voith_from_bytes(data: &[u8]) -> Option<VoithPwm>{
    if data.len() < VOITH_PWM_SIZE{
        return None;
    }
    Some(VoithPwm{
        left_servo1: u16_at(data, 0),
        left_servo2: u16_at(data, 1),
        right_servo1: u16_at(data, 2),
        right_servo2: u16_at(data, 3),
        left_motor: u16_at(data, 4),
        right_motor: u16_at(data, 5),
    })
}

//merge the latest attitude and depth into one sensor frame
pub fn sensor_frame(attitude: &AttitudeMsg, depth: f32) -> SensorFrame{
    SensorFrame{
        pitch: attitude.pitch as f64,
        roll: attitude.roll as f64,
        yaw: attitude.yaw as f64,
        pitch_rate: attitude.pitch_rate as f64,
        roll_rate: attitude.roll_rate as f64,
        yaw_rate: attitude.yaw_rate as f64,
        depth: depth as f64,
    }
}

#[cfg(test)]
mod tests{
    use super::*;

    #[test]
    fn test_msg_type_conversion(){
        assert_eq!(MsgType::from_u8(0x05), Some(MsgType::Attitude));
        assert_eq!(MsgType::from_u8(0x07), Some(MsgType::VoithPwm));
        assert_eq!(MsgType::from_u8(0xFF), None);
    }

    #[test]
    fn test_checksum(){
        let data = [0x01, 0x05, 0xAB, 0xCD];
        assert_eq!(checksum(&data), 0x01u8.wrapping_add(0x05).wrapping_add(0xAB).wrapping_add(0xCD));
    }

    #[test]
    fn test_encode_layout(){
        let frame = encode_frame(MsgType::Depth, &[1, 2, 3, 4]).unwrap();
        assert_eq!(frame, vec![0xAA, 0x02, 4, 1, 2, 3, 4, 0x02 + 4 + 1 + 2 + 3 + 4]);
    }

    #[test]
    fn test_encode_rejects_oversize(){
        let payload = vec![0u8; MAX_MSG_SIZE + 1];
        assert!(matches!(
            encode_frame(MsgType::Depth, &payload),
            Err(LinkError::PayloadTooLarge(245))
        ));
    }

    #[test]
    fn test_decode_split_stream(){
        let frame = encode_frame(MsgType::Battery, &scalar_to_bytes(12.5)).unwrap();
        let mut decoder = FrameDecoder::new();

        decoder.extend(&frame[..3]);
        assert!(decoder.next_frame().is_none());
        decoder.extend(&frame[3..]);

        let decoded = decoder.next_frame().unwrap();
        assert_eq!(decoded.msg_type, MsgType::Battery);
        assert_eq!(scalar_from_bytes(&decoded.payload), Some(12.5));
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_decode_skips_garbage_and_bad_frames(){
        let good = encode_frame(MsgType::Depth, &scalar_to_bytes(1.25)).unwrap();
        let mut corrupt = encode_frame(MsgType::Depth, &scalar_to_bytes(9.0)).unwrap();
        let last = corrupt.len() - 1;
        corrupt[last] ^= 0xFF;
        let unknown = vec![0xAA, 0x42, 0x00, 0x42];

        let mut stream = vec![0x00, 0x13, 0x37];
        stream.extend(&corrupt);
        stream.extend(&unknown);
        stream.extend(&good);

        let mut decoder = FrameDecoder::new();
        decoder.extend(&stream);
        let decoded = decoder.next_frame().unwrap();
        assert_eq!(decoded.msg_type, MsgType::Depth);
        assert_eq!(scalar_from_bytes(&decoded.payload), Some(1.25));
        assert!(decoder.next_frame().is_none());
    }

    #[test]
    fn test_attitude_payload(){
        let msg = AttitudeMsg{ roll: 1.5, pitch: -2.0, yaw: 359.0, roll_rate: 0.25, pitch_rate: 0.0, yaw_rate: -4.0 };
        let bytes = msg.to_bytes();
        assert_eq!(bytes.len(), ATTITUDE_MSG_SIZE);
        assert_eq!(AttitudeMsg::from_bytes(&bytes), Some(msg));
        assert!(AttitudeMsg::from_bytes(&bytes[..20]).is_none());

        let frame = sensor_frame(&msg, 3.5);
        assert_eq!(frame.yaw, 359.0);
        assert_eq!(frame.yaw_rate, -4.0);
        assert_eq!(frame.depth, 3.5);
    }

    #[test]
    fn test_pwm_payloads(){
        let vertical = VerticalPwm{ left: 1500, right: 1625, tail: 1100 };
        let bytes = vertical_to_bytes(&vertical);
        assert_eq!(bytes, vec![0xDC, 0x05, 0x59, 0x06, 0x4C, 0x04]);
        assert_eq!(vertical_from_bytes(&bytes), Some(vertical));

        let voith = VoithPwm{
            left_servo1: 1600,
            left_servo2: 1500,
            right_servo1: 1400,
            right_servo2: 1500,
            left_motor: 1900,
            right_motor: 1900,
        };
        let bytes = voith_to_bytes(&voith);
        assert_eq!(bytes.len(), VOITH_PWM_SIZE);
        assert_eq!(voith_from_bytes(&bytes), Some(voith));
    }
}
