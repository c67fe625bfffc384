use stm32g0xx_hal::dma::{Channel as DmaChannel, Direction, Event, Priority, WordSize};
use stm32g0xx_hal::hal::blocking::delay::DelayUs;
use stm32g0xx_hal::rcc::Rcc;
use stm32g0xx_hal::stm32g0::stm32g070::{ADC, RCC};

use crate::config::{CapturePath, ChannelCount, Inputs, OperationMode, Resolution, MAX_CHANNELS};
use crate::hil::{ScopeAdc, ScopeDma};

// Analog inputs of channels 1-3
// PA1 (IN1), PA4 (IN4), PA5 (IN5)
const DEDICATED_INPUTS: [u8; 3] = [1, 4, 5];
// PA6 (IN6), PA7 (IN7), PB0 (IN8)
const SHARED_INPUTS: [u8; 3] = [6, 7, 8];
// Sequencer slot terminating the conversion sequence
const SEQUENCE_END: u32 = 0xF;

pub struct Adc {
    adc: ADC,
    inputs: Inputs,
    sequence_len: usize,
    index: usize,
}

// FIXME Move this in some fashionable way upstream

impl Adc {
    pub fn new<D: DelayUs<u8>>(pac_adc: ADC, rcc: &mut Rcc, delay: &mut D) -> Self {
        Adc::enable_clock_and_reset(rcc);
        let mut adc = Adc {
            adc: pac_adc,
            inputs: Inputs {
                ch0: 0,
                shared_ch123: false,
            },
            sequence_len: 1,
            index: 0,
        };
        adc.disable();
        adc.enable_vreg(delay);
        adc.calibrate();
        adc.configure();
        adc.enable();
        adc
    }

    fn configure(&mut self) {
        self.adc.cfgr1.write(|w| unsafe {
            // External trigger rising edge
            w.exten().bits(0b01);
            // External trigger 3, TIM3 TRGO
            w.extsel().bits(0b011);
            // Right alignment
            w.align().clear_bit();
            // Fully configurable sequencer
            w.chselrmod().set_bit();
            // 10-bit resolution
            w.res().bits(0b01)
        });
        // 12.5 cycles, conversion group has to fit the shortest sample gap
        self.adc.smpr.write(|w| unsafe { w.smp1().bits(0b011) });
    }

    fn sequence(&self, channels: ChannelCount) -> u32 {
        let others = if self.inputs.shared_ch123 {
            SHARED_INPUTS
        } else {
            DEDICATED_INPUTS
        };
        let inputs = core::iter::once(self.inputs.ch0).chain(others.iter().copied());

        let mut sequence = u32::MAX;
        for (slot, input) in inputs.take(channels.get()).enumerate() {
            let shift = slot * 4;
            sequence &= !(SEQUENCE_END << shift);
            sequence |= u32::from(input) << shift;
        }
        sequence
    }

    fn enable_clock_and_reset(_: &mut Rcc) {
        let rcc = unsafe { &(*RCC::ptr()) };
        rcc.apbenr2.modify(|_, w| w.adcen().set_bit());
        rcc.apbrstr2.modify(|_, w| w.adcrst().set_bit());
        rcc.apbrstr2.modify(|_, w| w.adcrst().clear_bit());
    }

    fn enable_vreg<D: DelayUs<u8>>(&mut self, delay: &mut D) {
        self.adc.cr.modify(|_, w| w.advregen().set_bit());
        // Max starting time declared by stm32g070 datasheet is 20 us
        delay.delay_us(20);
    }

    fn enable(&mut self) {
        self.adc.isr.write(|w| w.adrdy().set_bit());
        self.adc.cr.modify(|_, w| w.aden().set_bit());
        while self.adc.isr.read().adrdy().bit_is_clear() {}
    }

    fn disable(&mut self) {
        let cr = self.adc.cr.read();
        if cr.aden().bit_is_clear() {
            return;
        }
        if cr.adstart().bit_is_set() {
            self.stop();
        }
        self.adc.cr.modify(|_, w| w.addis().set_bit());
        while self.adc.cr.read().aden().bit_is_set() {}
        self.adc.isr.write(|w| w.adrdy().set_bit());
    }

    fn calibrate(&mut self) {
        self.adc.cr.modify(|_, w| w.adcal().set_bit());
        while self.adc.isr.read().eocal().bit_is_clear() {}
        self.adc.isr.write(|w| w.eocal().set_bit());
    }
}

impl ScopeAdc for Adc {
    fn set_operation_mode(&mut self, mode: OperationMode, inputs: Inputs) {
        let res = match mode.resolution() {
            Resolution::Bits12 => 0b00,
            Resolution::Bits10 => 0b01,
        };
        let dma = mode.path() == CapturePath::Dma;

        // Resolution can only change while the ADC is off
        self.disable();
        self.adc.cfgr1.modify(|_, w| unsafe {
            w.res().bits(res);
            // One shot DMA, requests stop with the transfer complete
            w.dmacfg().clear_bit();
            w.dmaen().bit(dma)
        });
        self.enable();
        self.inputs = inputs;
    }

    fn set_conversion_channels(&mut self, channels: ChannelCount) {
        let sequence = self.sequence(channels);
        self.adc.isr.write(|w| w.ccrdy().set_bit());
        self.adc.chselr().write(|w| unsafe { w.bits(sequence) });
        while self.adc.isr.read().ccrdy().bit_is_clear() {}
        self.adc.isr.write(|w| w.ccrdy().set_bit());
        self.sequence_len = channels.get();
        self.index = 0;
    }

    fn unpend(&mut self) {
        self.adc.isr.write(|w| {
            w.eoc().set_bit();
            w.eos().set_bit();
            w.ovr().set_bit()
        });
        self.index = 0;
    }

    fn listen(&mut self) {
        self.adc.ier.modify(|_, w| w.eocie().set_bit());
    }

    fn unlisten(&mut self) {
        self.adc.ier.modify(|_, w| w.eocie().clear_bit());
    }

    fn start(&mut self) {
        self.adc.cr.modify(|_, w| w.adstart().set_bit());
    }

    fn stop(&mut self) {
        if self.adc.cr.read().adstart().bit_is_clear() {
            return;
        }
        self.adc.cr.modify(|_, w| w.adstp().set_bit());
        while self.adc.cr.read().adstart().bit_is_set() {}
    }

    fn read_group(&mut self, group: &mut [u16; MAX_CHANNELS]) -> bool {
        let isr = self.adc.isr.read();
        if isr.ovr().bit_is_set() {
            self.adc.isr.write(|w| w.ovr().set_bit());
        }
        if isr.eoc().bit_is_clear() {
            return false;
        }

        // Reading the data register clears EOC
        let value = self.adc.dr.read().bits() as u16;
        if self.index < MAX_CHANNELS {
            group[self.index] = value;
        }
        self.index += 1;

        if isr.eos().bit_is_clear() && self.index < self.sequence_len {
            return false;
        }
        self.adc.isr.write(|w| w.eos().set_bit());
        let complete = self.index == self.sequence_len;
        self.index = 0;
        complete
    }

    fn data_address(&self) -> u32 {
        unsafe { &(*ADC::ptr()).dr as *const _ as u32 }
    }
}

pub struct Dma<C> {
    channel: C,
}

impl<C> Dma<C>
where
    C: DmaChannel,
{
    pub fn new(channel: C) -> Self {
        let mut dma = Dma { channel };
        dma.channel.set_priority_level(Priority::VeryHigh);
        dma.channel.set_word_size(WordSize::BITS16);
        dma.channel.set_direction(Direction::FromPeripheral);
        dma.channel.set_circular_mode(false);
        dma
    }
}

impl<C> ScopeDma for Dma<C>
where
    C: DmaChannel,
{
    fn configure(&mut self, source: u32, destination: u32, count: u16) {
        self.channel.disable();
        self.channel.set_peripheral_address(source, false);
        self.channel.set_memory_address(destination, true);
        // CNDTR holds every transfer, the first one included
        self.channel.set_transfer_length(count.saturating_add(1));
    }

    fn unpend(&mut self) {
        self.channel.clear_event(Event::TransferComplete);
    }

    fn listen(&mut self) {
        self.channel.listen(Event::TransferComplete);
    }

    fn unlisten(&mut self) {
        self.channel.unlisten(Event::TransferComplete);
    }

    fn enable(&mut self) {
        self.channel.enable();
    }

    fn disable(&mut self) {
        self.channel.disable();
    }

    fn remaining(&mut self) -> u16 {
        self.channel.get_transfer_remaining()
    }
}
