pub mod ether;
pub mod icmp;
pub mod ip;
pub mod ipfrag;
pub mod tcp;
pub mod udp;

#[cfg(feature = "netcap")]
pub mod capconfig;
#[cfg(feature = "netcap")]
pub mod capdevice;
#[cfg(feature = "netcap")]
pub mod capfile;
#[cfg(feature = "netcap")]
pub mod netcap;
