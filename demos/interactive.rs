use std::io::prelude::*;

use gsm_ta::config::ModemConfig;
use gsm_ta::event::EventSink;
use gsm_ta::gsm_encoding::GsmMessageData;
use gsm_ta::meta::MeTa;
use gsm_ta::pdu::{DeliverPdu, Pdu, PduAddress};
use gsm_ta::port::SerialPort;
use gsm_ta::sms_store::MessageStatus;
use gsm_ta::cmd;

/// Prints every URC as it arrives, instead of queuing it for later.
struct PrintingSink;
impl EventSink for PrintingSink {
    fn on_sms_indication(&mut self, memory: &str, index: u32) {
        println!("URC: new message in {} at index {}", memory, index);
    }
    fn on_sms(&mut self, message: &DeliverPdu) {
        println!("URC: message delivered directly: {:?}", message);
    }
    fn on_call(&mut self) {
        println!("URC: incoming call");
    }
}

fn main() {
    env_logger::init();
    let config = ModemConfig::default();
    let port = SerialPort::open("/dev/ttyUSB2", config.baud_rate).unwrap();
    let mut meta = MeTa::open(Box::new(port), config).unwrap();
    meta.set_event_handler(Box::new(PrintingSink));

    println!("Negotiating new message indications...");
    let result = meta.set_sms_routing_to_ta(true, false, false, false);
    println!("Result: {:?}", result);

    println!("\n### Instructions for use ###");
    println!("- Read messages by typing 'read'");
    println!("- Send messages by typing '[recipient];[message]', replacing [recipient] with the phone number and [message] with the message");
    println!("- Delete all messages by typing 'del'");
    println!();

    let stdin = ::std::io::stdin();
    let lock = stdin.lock();
    for ln in lock.lines() {
        let ln = ln.unwrap();
        if ln == "read" {
            println!("Reading messages...");
            let result = cmd::sms::list_sms_pdu(&mut meta, MessageStatus::All);
            match result {
                Ok(msgs) => {
                    for msg in msgs {
                        println!("Message: {:?}", msg);
                        if let gsm_ta::pdu::SmsMessage::Deliver(deliver) = &msg.message {
                            match deliver.get_message_data().decode_message() {
                                Ok(dm) => {
                                    println!("Text: {}", dm.text);
                                    if let Some(u) = dm.udh {
                                        println!("User data header: {:?}", u);
                                    }
                                }
                                Err(e) => println!("Decode failed: {}", e),
                            }
                        }
                    }
                }
                Err(e) => println!("Result: Err({})", e),
            }
            continue;
        }
        if ln == "del" {
            println!("Deleting messages...");
            let result = cmd::sms::del_sms_pdu(&mut meta, cmd::sms::DeletionOptions::DeleteAll);
            println!("Result: {:?}", result);
            continue;
        }
        let ln: Vec<&str> = ln.split(';').collect();
        if ln.len() != 2 {
            println!("expected '[recipient];[message]'");
            continue;
        }
        println!("Sending {:?} to {}...", ln[1], ln[0]);
        let recipient: PduAddress = ln[0].parse().unwrap();
        println!("Recipient: {:?}", recipient);
        let parts = GsmMessageData::encode_message(ln[1]);
        println!("Message parts: {:?}", parts);
        for data in parts {
            let pdu = Pdu::make_simple_message(recipient.clone(), data);
            println!("PDU: {:?}", pdu);
            let result = meta.send_sms(&pdu);
            println!("Result: {:?}", result);
        }
    }
}
