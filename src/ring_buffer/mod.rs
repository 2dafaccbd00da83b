//fixed-capacity ring buffer with per-slot epochs
//freshness bias: pushing into a full buffer overwrites the oldest item

struct Slot<T>{
    data: T,
    epoch: u64, //epoch when this slot was written
}

pub struct RingBuffer<T>{
    slots: Vec<Option<Slot<T>>>,
    head: usize, //next write position
    len: usize,
    write_epoch: u64,
    dropped: u64, //items overwritten before being read
}

impl<T: Clone> RingBuffer<T>{
    pub fn new(capacity: usize) -> Self{
        assert!(capacity > 0, "ring buffer capacity must be non-zero");

        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);

        RingBuffer{
            slots,
            head: 0,
            len: 0,
            write_epoch: 0,
            dropped: 0,
        }
    }

    fn tail(&self) -> usize{
        (self.head + self.capacity() - self.len) % self.capacity()
    }

    //push item, return the epoch it was written at
    pub fn push(&mut self, item: T) -> u64{
        if self.is_full(){
            self.dropped += 1;
        }else{
            self.len += 1;
        }

        self.write_epoch += 1;
        self.slots[self.head] = Some(Slot{ data: item, epoch: self.write_epoch });
        self.head = (self.head + 1) % self.capacity();

        self.write_epoch
    }

    //pop the oldest item
    pub fn pop(&mut self) -> Option<T>{
        if self.len == 0{
            return None;
        }
        let tail = self.tail();
        self.len -= 1;
        self.slots[tail].take().map(|slot| slot.data)
    }

    //newest item and its epoch, without consuming
    pub fn peek_latest(&self) -> Option<(T, u64)>{
        if self.len == 0{
            return None;
        }
        let latest = (self.head + self.capacity() - 1) % self.capacity();
        self.slots[latest].as_ref().map(|slot| (slot.data.clone(), slot.epoch))
    }

    pub fn latest_epoch(&self) -> u64{
        self.write_epoch
    }

    pub fn dropped(&self) -> u64{
        self.dropped
    }

    pub fn len(&self) -> usize{
        self.len
    }

    pub fn is_empty(&self) -> bool{
        self.len == 0
    }

    pub fn is_full(&self) -> bool{
        self.len == self.capacity()
    }

    pub fn capacity(&self) -> usize{
        self.slots.len()
    }
}
