//anything that can travel over a topic between threads
pub trait Message: Clone + Send + 'static{}

impl<T: Clone + Send + 'static> Message for T{}
