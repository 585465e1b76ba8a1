mod codec;
mod dremel;
mod io;
