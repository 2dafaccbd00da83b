use std::sync::{Mutex, MutexGuard, TryLockError};
use crate::ring_buffer::RingBuffer;
use super::message::Message;

//named, freshness-biased queue shared between threads
//every operation uses try_lock: a contended topic reports "nothing" instead of
//stalling the caller, so the control loop can publish and drain without blocking
pub struct Topic<T: Message>{
    name: String,
    buffer: Mutex<RingBuffer<T>>,
}

impl<T: Message> Topic<T>{
    pub fn new(name: &str, capacity: usize) -> Self{
        Topic{
            name: name.to_string(),
            buffer: Mutex::new(RingBuffer::new(capacity)),
        }
    }

    pub fn name(&self) -> &str{
        &self.name
    }

    fn try_buffer(&self) -> Option<MutexGuard<'_, RingBuffer<T>>>{
        match self.buffer.try_lock(){
            Ok(guard) => Some(guard),
            //a panicked holder cannot leave the ring half-written
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    //returns the epoch, or None if the topic was busy and the message dropped
    pub fn publish(&self, msg: T) -> Option<u64>{
        self.try_buffer().map(|mut rb| rb.push(msg))
    }

    pub fn try_receive(&self) -> Option<T>{
        self.try_buffer()?.pop()
    }

    //pop everything currently queued, oldest first
    pub fn drain(&self) -> Vec<T>{
        let mut out = Vec::new();
        if let Some(mut rb) = self.try_buffer(){
            while let Some(msg) = rb.pop(){
                out.push(msg);
            }
        }
        out
    }

    pub fn peek_latest(&self) -> Option<(T, u64)>{
        self.try_buffer()?.peek_latest()
    }

    pub fn latest_epoch(&self) -> u64{
        self.try_buffer().map_or(0, |rb| rb.latest_epoch())
    }

    pub fn len(&self) -> usize{
        self.try_buffer().map_or(0, |rb| rb.len())
    }

    pub fn is_empty(&self) -> bool{
        self.len() == 0
    }
}
